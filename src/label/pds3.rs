use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use regex::Regex;

use super::{file_stem, InstrumentIdentity, LabelConfig, ObservationRecord, ParseError};

/// Bytes scanned for an embedded label when the record geometry is unknown.
const EMBEDDED_LABEL_PROBE: u64 = 128 * 1024;

/// Read the label text of a detached `.LBL` or an image with an embedded
/// label. Embedded labels span `LABEL_RECORDS * RECORD_BYTES` bytes.
pub fn read_label_text(path: &Path) -> io::Result<String> {
    let detached = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("lbl"));
    if detached {
        let bytes = std::fs::read(path)?;
        return Ok(String::from_utf8_lossy(&bytes).into_owned());
    }

    let mut head = Vec::new();
    File::open(path)?
        .take(EMBEDDED_LABEL_PROBE)
        .read_to_end(&mut head)?;
    let text = String::from_utf8_lossy(&head).into_owned();

    let records = keyword(&text, "LABEL_RECORDS").and_then(|v| v.parse::<u64>().ok());
    let record_bytes = keyword(&text, "RECORD_BYTES").and_then(|v| v.parse::<u64>().ok());
    match (records, record_bytes) {
        (Some(n), Some(size)) => {
            let length = n.checked_mul(size).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("label size {} x {} overflows", n, size),
                )
            })?;
            let mut label = Vec::new();
            File::open(path)?.take(length).read_to_end(&mut label)?;
            Ok(String::from_utf8_lossy(&label).into_owned())
        }
        _ => Ok(text),
    }
}

/// Value of the first `KEY = value` statement, with quotes and a trailing
/// unit tag (`<s>`) removed.
pub fn keyword(text: &str, key: &str) -> Option<String> {
    keyword_with_unit(text, key).map(|(value, _)| value)
}

fn keyword_with_unit(text: &str, key: &str) -> Option<(String, Option<String>)> {
    let pattern = format!(r"(?m)^[ \t]*{}[ \t]*=[ \t]*(.+?)[ \t\r]*$", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    let raw = re.captures(text)?.get(1)?.as_str().trim();

    let (value, unit) = match raw.rfind('<') {
        Some(idx) if raw.ends_with('>') && !raw.starts_with('"') => (
            raw[..idx].trim(),
            Some(raw[idx + 1..raw.len() - 1].trim().to_ascii_lowercase()),
        ),
        _ => (raw, None),
    };
    let value = value.trim_matches('"').trim_matches('\'').trim();
    if value.is_empty() {
        None
    } else {
        Some((value.to_string(), unit))
    }
}

/// Raster extent `(samples, lines)` declared by the label's IMAGE object,
/// falling back to the whole label when there is no such object.
pub fn image_extent(text: &str) -> Option<(u32, u32)> {
    let object = Regex::new(r"(?is)OBJECT\s*=\s*IMAGE\b(.*?)END_OBJECT\s*=\s*IMAGE\b")
        .ok()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str());

    let samples = keyword(object, "LINE_SAMPLES")?.parse().ok()?;
    let lines = keyword(object, "LINES")?.parse().ok()?;
    Some((samples, lines))
}

pub fn parse(path: &Path, config: &LabelConfig) -> Result<ObservationRecord, ParseError> {
    let text = read_label_text(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let start_time = keyword(&text, "START_TIME")
        .or_else(|| keyword(&text, "IMAGE_TIME"))
        .ok_or_else(|| ParseError::MissingField {
            path: path.to_path_buf(),
            field: "START_TIME",
        })?;

    let exposure_key = config.exposure_field.as_deref().unwrap_or("EXPOSURE_DURATION");
    let exposure_duration = match keyword_with_unit(&text, exposure_key) {
        Some((raw, unit)) => {
            let value = raw.parse::<f64>().map_err(|_| ParseError::InvalidField {
                path: path.to_path_buf(),
                field: "EXPOSURE_DURATION",
                value: raw.clone(),
            })?;
            match unit.as_deref() {
                Some("ms") => Some(value / 1000.0),
                _ => Some(value),
            }
        }
        None => None,
    };

    let code = config
        .instrument_fields
        .iter()
        .find_map(|k| keyword(&text, k));
    let category = match (&code, config.category_field.as_deref()) {
        (None, Some(k)) => keyword(&text, k).and_then(|v| v.parse().ok()),
        _ => None,
    };

    Ok(ObservationRecord {
        name: file_stem(path),
        label_path: path.to_path_buf(),
        start_time,
        target_name: keyword(&text, "TARGET_NAME"),
        target_type: keyword(&text, "TARGET_TYPE"),
        instrument: InstrumentIdentity {
            frame_name: config
                .frame_name_field
                .as_deref()
                .and_then(|k| keyword(&text, k)),
            number: config
                .instrument_number_field
                .as_deref()
                .and_then(|k| keyword(&text, k))
                .and_then(|v| v.parse().ok()),
            code,
            category,
        },
        exposure_duration,
        image_reference: Some(path.to_path_buf()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::LabelFormat;
    use std::fs;
    use tempfile::TempDir;

    const NAC_LABEL: &str = "PDS_VERSION_ID       = PDS3\r
RECORD_BYTES         = 2048\r
LABEL_RECORDS        = 2\r
TARGET_NAME          = \"67P/CHURYUMOV-GERASIMENKO 1 (1969 R1)\"\r
TARGET_TYPE          = COMET\r
START_TIME           = 2014-08-01T10:20:30.123\r
DETECTOR_ID          = NAC\r
INSTRUMENT_ID        = OSIRIS\r
EXPOSURE_DURATION    = 540 <ms>\r
OBJECT               = IMAGE\r
  LINES              = 2048\r
  LINE_SAMPLES       = 2048\r
END_OBJECT           = IMAGE\r
END\r
";

    fn rosetta_config() -> LabelConfig {
        LabelConfig {
            format: LabelFormat::Pds3,
            extensions: vec!["img".into()],
            image_extension: "img".into(),
            frame_name_field: None,
            instrument_number_field: None,
            instrument_fields: vec!["DETECTOR_ID".into(), "INSTRUMENT_ID".into()],
            category_field: None,
            exposure_field: None,
        }
    }

    fn write_embedded(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let mut bytes = NAC_LABEL.as_bytes().to_vec();
        bytes.resize(4096, b' ');
        // Pixel data after the label must not leak into keyword lookups.
        bytes.extend_from_slice(b"\nSTART_TIME = 1999-01-01T00:00:00.000\n");
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn parses_embedded_label() {
        let dir = TempDir::new().unwrap();
        let path = write_embedded(&dir, "N20140801T102030123ID30F22.IMG");

        let record = parse(&path, &rosetta_config()).unwrap();
        assert_eq!(record.name, "N20140801T102030123ID30F22");
        assert_eq!(record.start_time, "2014-08-01T10:20:30.123");
        assert_eq!(
            record.target_name.as_deref(),
            Some("67P/CHURYUMOV-GERASIMENKO 1 (1969 R1)")
        );
        assert_eq!(record.target_type.as_deref(), Some("COMET"));
        assert_eq!(record.instrument.code.as_deref(), Some("NAC"));
        assert_eq!(record.exposure_duration, Some(0.54));
        assert_eq!(record.image_reference.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn oversized_label_geometry_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CORRUPT.IMG");
        let label = NAC_LABEL.replace("RECORD_BYTES         = 2048", "RECORD_BYTES         = 18446744073709551615");
        fs::write(&path, label).unwrap();

        let err = parse(&path, &rosetta_config()).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Io { ref source, .. } if source.kind() == io::ErrorKind::InvalidData
        ));
    }

    #[test]
    fn extent_comes_from_image_object() {
        assert_eq!(image_extent(NAC_LABEL), Some((2048, 2048)));
        let bare = "LINES = 512\nLINE_SAMPLES = 1024\n";
        assert_eq!(image_extent(bare), Some((1024, 512)));
        assert_eq!(image_extent("PDS_VERSION_ID = PDS3\n"), None);
    }

    #[test]
    fn image_time_is_the_fallback_start() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ROS_CAM1_20150101T000000.LBL");
        fs::write(
            &path,
            "IMAGE_TIME = 2015-01-01T00:00:00.500\nINSTRUMENT_ID = NAVCAM\n",
        )
        .unwrap();

        let record = parse(&path, &rosetta_config()).unwrap();
        assert_eq!(record.start_time, "2015-01-01T00:00:00.500");
        assert_eq!(record.instrument.code.as_deref(), Some("NAVCAM"));
        assert_eq!(record.exposure_duration, None);
    }
}
