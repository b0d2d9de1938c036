use std::fs;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{file_stem, InstrumentIdentity, LabelConfig, ObservationRecord, ParseError};

/// Leaf elements of a PDS4 label in document order, keyed by the chain of
/// local names from the root. Namespace prefixes are dropped.
struct Pds4Document {
    elements: Vec<(Vec<String>, String)>,
}

impl Pds4Document {
    fn parse(xml: &str) -> Result<Self, String> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<(String, String)> = Vec::new();
        let mut elements = Vec::new();

        loop {
            match reader.read_event().map_err(|e| e.to_string())? {
                Event::Start(start) => {
                    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                    stack.push((name, String::new()));
                }
                Event::Text(text) => {
                    if let Some((_, buf)) = stack.last_mut() {
                        buf.push_str(&text.unescape().map_err(|e| e.to_string())?);
                    }
                }
                Event::CData(data) => {
                    if let Some((_, buf)) = stack.last_mut() {
                        buf.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::End(_) => {
                    let path: Vec<String> = stack.iter().map(|(n, _)| n.clone()).collect();
                    if let Some((_, text)) = stack.pop() {
                        let text = text.trim();
                        if !text.is_empty() {
                            elements.push((path, text.to_string()));
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self { elements })
    }

    /// First element whose path ends with the `/`-separated `suffix`.
    fn find(&self, suffix: &str) -> Option<&str> {
        let wanted: Vec<&str> = suffix.split('/').filter(|s| !s.is_empty()).collect();
        if wanted.is_empty() {
            return None;
        }
        self.elements
            .iter()
            .find(|(path, _)| {
                path.len() >= wanted.len()
                    && path[path.len() - wanted.len()..]
                        .iter()
                        .zip(&wanted)
                        .all(|(a, b)| a == b)
            })
            .map(|(_, text)| text.as_str())
    }
}

pub fn parse(path: &Path, config: &LabelConfig) -> Result<ObservationRecord, ParseError> {
    let xml = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc = Pds4Document::parse(&xml).map_err(|message| ParseError::Xml {
        path: path.to_path_buf(),
        message,
    })?;

    let start_time = doc
        .find("start_date_time")
        .ok_or_else(|| ParseError::MissingField {
            path: path.to_path_buf(),
            field: "start_date_time",
        })?
        .to_string();

    let target_name = doc
        .find("target_name")
        .or_else(|| doc.find("Target_Identification/name"))
        .map(String::from);

    let label_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let (name, image_reference) = match doc.find("File_Area_Observational/File/file_name") {
        Some(file_name) => (file_stem(Path::new(file_name)), label_dir.join(file_name)),
        None => {
            let stem = file_stem(path);
            let image = label_dir.join(format!("{}.{}", stem, config.image_extension));
            (stem, image)
        }
    };

    let frame_name = config
        .frame_name_field
        .as_deref()
        .and_then(|f| doc.find(f))
        .map(String::from);

    // An unparsable instrument number is treated as absent.
    let number = config
        .instrument_number_field
        .as_deref()
        .and_then(|f| doc.find(f))
        .and_then(|v| v.parse::<i32>().ok());

    let code = config
        .instrument_fields
        .iter()
        .find_map(|f| doc.find(f))
        .map(String::from);

    let category = if code.is_none() {
        config
            .category_field
            .as_deref()
            .and_then(|f| doc.find(f))
            .and_then(|v| v.parse::<i64>().ok())
    } else {
        None
    };

    let exposure_duration = match config.exposure_field.as_deref().and_then(|f| doc.find(f)) {
        Some(raw) => Some(raw.parse::<f64>().map_err(|_| ParseError::InvalidField {
            path: path.to_path_buf(),
            field: "exposure_duration",
            value: raw.to_string(),
        })?),
        None => None,
    };

    Ok(ObservationRecord {
        name,
        label_path: path.to_path_buf(),
        start_time,
        target_name,
        target_type: doc.find("Target_Identification/type").map(String::from),
        instrument: InstrumentIdentity {
            frame_name,
            number,
            code,
            category,
        },
        exposure_duration,
        image_reference: Some(image_reference),
    })
}
