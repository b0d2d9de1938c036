use nalgebra::Vector3;
use serde::Serialize;

/// One accepted view, serialised with the short field names the viewer
/// reads. Vectors are in the target body-fixed frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewRecord {
    #[serde(rename = "nm")]
    pub name: String,
    #[serde(rename = "ti")]
    pub sample_time: String,
    #[serde(rename = "cv")]
    pub sight: [f64; 3],
    pub up: [f64; 3],
    #[serde(rename = "su")]
    pub sun: [f64; 3],
    #[serde(rename = "sc")]
    pub spacecraft: [f64; 3],
    #[serde(rename = "rz", skip_serializing_if = "Option::is_none")]
    pub resolution_override: Option<u32>,
}

fn array(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

impl ViewRecord {
    pub fn new(
        name: String,
        sample_time: String,
        sight: Vector3<f64>,
        up: Vector3<f64>,
        sun: Vector3<f64>,
        spacecraft: Vector3<f64>,
    ) -> Self {
        Self {
            name,
            sample_time,
            sight: array(&sight),
            up: array(&up),
            sun: array(&sun),
            spacecraft: array(&spacecraft),
            resolution_override: None,
        }
    }
}
