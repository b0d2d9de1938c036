//! Pixel extent of the image associated with an observation.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::label::pds3;

const FITS_BLOCK: usize = 2880;
const FITS_CARD: usize = 80;
/// Largest axis count the FITS standard allows.
const MAX_NAXIS: i64 = 999;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("cannot read image {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },
}

/// `(width, height)` of the image at `path`.
pub fn probe(path: &Path) -> Result<(u32, u32), ImageError> {
    if !path.exists() {
        return Err(ImageError::NotFound(path.to_path_buf()));
    }
    let unreadable = |reason: String| ImageError::Unreadable {
        path: path.to_path_buf(),
        reason,
    };

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "fit" | "fits" | "fts" => fits_extent(path).map_err(unreadable),
        "img" | "lbl" => {
            let text = pds3::read_label_text(path).map_err(|e| unreadable(e.to_string()))?;
            pds3::image_extent(&text).ok_or_else(|| unreadable("no IMAGE object in label".to_string()))
        }
        _ => image::image_dimensions(path).map_err(|e| unreadable(e.to_string())),
    }
}

/// Extent of the first HDU that carries data.
fn fits_extent(path: &Path) -> Result<(u32, u32), String> {
    let mut reader = BufReader::new(File::open(path).map_err(|e| e.to_string())?);

    loop {
        let header = match read_fits_header(&mut reader) {
            Ok(Some(header)) => header,
            Ok(None) => return Err("no image data HDU found".to_string()),
            Err(e) => return Err(e.to_string()),
        };

        let int = |key: &str| header.get(key).copied().unwrap_or(0);
        let naxis = int("NAXIS");
        if !(0..=MAX_NAXIS).contains(&naxis) {
            return Err(format!("invalid NAXIS {}", naxis));
        }
        let axes: Vec<i64> = (1..=naxis).map(|n| int(&format!("NAXIS{}", n))).collect();
        let bytes = data_bytes(&axes, int("BITPIX"), int("PCOUNT"), header.get("GCOUNT").copied().unwrap_or(1))
            .ok_or_else(|| format!("data size overflows (NAXIS={})", naxis))?;

        if bytes == 0 {
            continue;
        }
        if axes.len() < 2 {
            return Err(format!("image not 2-D (NAXIS={})", naxis));
        }
        let width = u32::try_from(axes[0]).map_err(|_| format!("invalid NAXIS1 {}", axes[0]))?;
        let height = u32::try_from(axes[1]).map_err(|_| format!("invalid NAXIS2 {}", axes[1]))?;
        return Ok((width, height));
    }
}

/// Size in bytes of an HDU's data unit, `None` when header values overflow.
fn data_bytes(axes: &[i64], bitpix: i64, pcount: i64, gcount: i64) -> Option<i64> {
    let elements = match axes {
        [] => 0,
        _ => axes.iter().try_fold(1i64, |acc, n| acc.checked_mul(*n))?,
    };
    (bitpix.checked_abs()? / 8)
        .checked_mul(gcount)?
        .checked_mul(pcount.checked_add(elements)?)
}

/// Integer cards of the next header, `None` at a clean end of file.
fn read_fits_header<R: Read>(reader: &mut R) -> io::Result<Option<HashMap<String, i64>>> {
    let mut cards = HashMap::new();
    let mut block = [0u8; FITS_BLOCK];
    let mut first = true;

    loop {
        if let Err(e) = reader.read_exact(&mut block) {
            if first && e.kind() == io::ErrorKind::UnexpectedEof {
                return Ok(None);
            }
            return Err(e);
        }
        first = false;

        for card in block.chunks(FITS_CARD) {
            let keyword = String::from_utf8_lossy(&card[..8]);
            let keyword = keyword.trim();
            if keyword == "END" {
                return Ok(Some(cards));
            }
            if &card[8..10] != b"= " {
                continue;
            }
            let value = String::from_utf8_lossy(&card[10..]);
            let value = value.split('/').next().unwrap_or("").trim();
            if let Ok(v) = value.parse::<i64>() {
                cards.insert(keyword.to_string(), v);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    /// Minimal FITS file: an optional empty primary HDU followed by a 16-bit
    /// image of `width` x `height` pixels.
    pub(crate) fn write_fits(path: &Path, width: u32, height: u32, empty_primary: bool) {
        fn header(cards: &[String]) -> Vec<u8> {
            let mut bytes = Vec::new();
            for card in cards.iter().map(String::as_str).chain(std::iter::once("END")) {
                bytes.extend_from_slice(format!("{:<80}", card).as_bytes());
            }
            bytes.resize(bytes.len().div_ceil(FITS_BLOCK) * FITS_BLOCK, b' ');
            bytes
        }
        let card = |k: &str, v: &str| format!("{:<8}= {:>20}", k, v);

        let mut bytes = Vec::new();
        if empty_primary {
            bytes.extend(header(&[card("SIMPLE", "T"), card("BITPIX", "8"), card("NAXIS", "0")]));
        }
        let first = if empty_primary { card("XTENSION", "'IMAGE   '") } else { card("SIMPLE", "T") };
        bytes.extend(header(&[
            first,
            card("BITPIX", "16"),
            card("NAXIS", "2"),
            card("NAXIS1", &width.to_string()),
            card("NAXIS2", &height.to_string()),
        ]));
        let data = (width as usize) * (height as usize) * 2;
        bytes.resize(bytes.len() + data.div_ceil(FITS_BLOCK) * FITS_BLOCK, 0);
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn fits_extent_from_first_data_hdu() {
        let dir = TempDir::new().unwrap();
        let simple = dir.path().join("simple.fits");
        write_fits(&simple, 64, 32, false);
        assert_eq!(probe(&simple).unwrap(), (64, 32));

        let extension = dir.path().join("ext.FIT");
        write_fits(&extension, 16, 16, true);
        assert_eq!(probe(&extension).unwrap(), (16, 16));
    }

    #[test]
    fn header_only_fits_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.fits");
        let mut bytes = format!("{:<80}{:<80}{:<80}", "SIMPLE  =                    T", "NAXIS   =                    0", "END")
            .into_bytes();
        bytes.resize(FITS_BLOCK, b' ');
        fs::write(&path, bytes).unwrap();
        assert!(matches!(probe(&path), Err(ImageError::Unreadable { .. })));
    }

    #[rstest]
    #[case(&["BITPIX", "16", "NAXIS", "2", "NAXIS1", "99999999999", "NAXIS2", "99999999999"])]
    #[case(&["BITPIX", "-9223372036854775808", "NAXIS", "2", "NAXIS1", "16", "NAXIS2", "16"])]
    #[case(&["BITPIX", "16", "NAXIS", "2", "NAXIS1", "16", "NAXIS2", "16", "PCOUNT", "9223372036854775807"])]
    #[case(&["BITPIX", "16", "NAXIS", "1000000000000"])]
    fn hostile_header_values_are_unreadable(#[case] pairs: &[&str]) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hostile.fits");
        let mut bytes = format!("{:<80}", "SIMPLE  =                    T").into_bytes();
        for kv in pairs.chunks(2) {
            bytes.extend_from_slice(format!("{:<80}", format!("{:<8}= {:>20}", kv[0], kv[1])).as_bytes());
        }
        bytes.extend_from_slice(format!("{:<80}", "END").as_bytes());
        bytes.resize(FITS_BLOCK, b' ');
        fs::write(&path, bytes).unwrap();
        assert!(matches!(probe(&path), Err(ImageError::Unreadable { .. })));
    }

    #[test]
    fn data_size_checks_overflow() {
        assert_eq!(data_bytes(&[16, 16], 16, 0, 1), Some(512));
        assert_eq!(data_bytes(&[], 8, 0, 1), Some(0));
        assert_eq!(data_bytes(&[i64::MAX, 2], 8, 0, 1), None);
        assert_eq!(data_bytes(&[16, 16], i64::MIN, 0, 1), None);
    }

    #[test]
    fn pds3_and_raster_images() {
        let dir = TempDir::new().unwrap();
        let lbl = dir.path().join("frame.LBL");
        fs::write(&lbl, "OBJECT = IMAGE\n LINES = 1024\n LINE_SAMPLES = 1024\nEND_OBJECT = IMAGE\nEND\n").unwrap();
        assert_eq!(probe(&lbl).unwrap(), (1024, 1024));

        let png = dir.path().join("frame.png");
        image::RgbImage::new(12, 7).save(&png).unwrap();
        assert_eq!(probe(&png).unwrap(), (12, 7));

        let garbage = dir.path().join("frame.jpg");
        fs::write(&garbage, b"not a jpeg").unwrap();
        assert!(matches!(probe(&garbage), Err(ImageError::Unreadable { .. })));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            probe(&dir.path().join("absent.fits")),
            Err(ImageError::NotFound(_))
        ));
    }
}
