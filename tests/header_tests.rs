// tests/header_tests.rs
use pax_rs::*;

fn sample_bytes() -> Vec<u8> {
    let data = [158.98166f32, 171.61903, 160.06989, 148.83504];
    let mut raster = RasterFile::with_data(RasterType::Float, 2, 2, &data).unwrap();
    raster.add_comment_at(MetaLocation::AfterTag, "header test fixture");
    raster.add_meta_at(MetaLocation::End, "pi", 3.1416f32);
    raster.export_bytes().to_vec()
}

/// Byte offset of the first payload byte: right after the DATA_LENGTH
/// line's newline. Everything before it is ASCII.
fn payload_start(bytes: &[u8]) -> usize {
    let header = String::from_utf8_lossy(bytes);
    let line = header.find("DATA_LENGTH").unwrap();
    line + bytes[line..].iter().position(|&b| b == b'\n').unwrap() + 1
}

/// Apply a text edit to the header while leaving the binary payload
/// byte-for-byte intact.
fn edit_header(bytes: &[u8], from: &str, to: &str) -> Vec<u8> {
    let split = payload_start(bytes);
    let header = std::str::from_utf8(&bytes[..split]).unwrap();
    let mut out = header.replacen(from, to, 1).into_bytes();
    out.extend_from_slice(&bytes[split..]);
    out
}

/// Drop one header line from a serialized raster.
fn without_line(bytes: &[u8], tag: &str) -> Vec<u8> {
    let header = std::str::from_utf8(&bytes[..payload_start(bytes)]).unwrap();
    let line_start = header.find(tag).unwrap();
    let line_end = line_start + bytes[line_start..].iter().position(|&b| b == b'\n').unwrap() + 1;
    let mut out = bytes[..line_start].to_vec();
    out.extend_from_slice(&bytes[line_end..]);
    out
}

#[test]
fn test_missing_required_tags_rejected() {
    let bytes = sample_bytes();
    for tag in [
        "BYTES_PER_VALUE",
        "VALUES_PER_ELEMENT",
        "ELEMENTS_IN_SEQUENTIAL_DIMENSION",
        "ELEMENTS_IN_STRIDED_DIMENSION",
    ] {
        let broken = without_line(&bytes, tag);
        assert!(
            matches!(
                RasterFile::from_bytes(&broken),
                Err(PaxError::TagCount { count: 0, .. })
            ),
            "dropping {tag} must be a structure error"
        );
    }
}

#[test]
fn test_duplicated_tag_rejected() {
    let doubled = edit_header(
        &sample_bytes(),
        "VALUES_PER_ELEMENT : 1\n",
        "VALUES_PER_ELEMENT : 1\nVALUES_PER_ELEMENT : 1\n",
    );
    assert!(matches!(
        RasterFile::from_bytes(&doubled),
        Err(PaxError::TagCount { count: 2, .. })
    ));
}

#[test]
fn test_data_length_mismatch_rejected() {
    let bad = edit_header(&sample_bytes(), "DATA_LENGTH : 16", "DATA_LENGTH : 12");
    assert!(matches!(
        RasterFile::from_bytes(&bad),
        Err(PaxError::DataLengthMismatch { found: 12, expected: 16 })
    ));
}

#[test]
fn test_bpv_contradicting_type_rejected() {
    // keep DATA_LENGTH arithmetic consistent so only the bpv check can fire
    let bad = edit_header(&sample_bytes(), "BYTES_PER_VALUE : 4", "BYTES_PER_VALUE : 8");
    let bad = edit_header(&bad, "DATA_LENGTH : 16", "DATA_LENGTH : 32");
    assert!(matches!(
        RasterFile::from_bytes(&bad),
        Err(PaxError::FieldMismatch { .. })
    ));
}

#[test]
fn test_malformed_structural_number() {
    let bad = edit_header(&sample_bytes(), "BYTES_PER_VALUE : 4", "BYTES_PER_VALUE : four");
    assert!(matches!(
        RasterFile::from_bytes(&bad),
        Err(PaxError::MalformedNumber { .. })
    ));
}

#[test]
fn test_unknown_tag_line_ignored() {
    let extended = edit_header(
        &sample_bytes(),
        "BYTES_PER_VALUE",
        "SOME_FUTURE_TAG : anything at all\nBYTES_PER_VALUE",
    );
    let raster = RasterFile::from_bytes(&extended).unwrap();
    assert_eq!(raster.element::<f32>(1, 1).unwrap(), 148.83504);
    assert!(raster.warnings().is_empty());
}

#[test]
fn test_unknown_metadata_type_is_warning_not_error() {
    let extended = edit_header(
        &sample_bytes(),
        "BYTES_PER_VALUE",
        "## [quaternion] spin = 1 0 0 0\nBYTES_PER_VALUE",
    );
    let raster = RasterFile::from_bytes(&extended).unwrap();
    assert_eq!(raster.warnings().len(), 1);
    assert!(matches!(
        &raster.warnings()[0],
        ParseWarning::UnknownMetadataType { tag, .. } if tag == "quaternion"
    ));
    // the rest of the header still parsed
    assert_eq!(raster.get_meta::<f32>("pi").unwrap(), 3.1416);
}

#[test]
fn test_case_insensitive_tags() {
    let lowered = edit_header(&sample_bytes(), "BYTES_PER_VALUE", "bytes_per_value");
    let lowered = edit_header(&lowered, "VALUES_PER_ELEMENT", "values_Per_Element");
    let lowered = edit_header(&lowered, "DATA_LENGTH", "data_length");
    let raster = RasterFile::from_bytes(&lowered).unwrap();
    assert_eq!(raster.sequential(), 2);
    assert_eq!(raster.element::<f32>(0, 0).unwrap(), 158.98166);
}

#[test]
fn test_preview_type_reads_only_tag_line() {
    let bytes = sample_bytes();
    assert_eq!(
        RasterFile::preview_type(&bytes[..28]).unwrap(),
        RasterType::Float
    );
    assert!(matches!(
        RasterFile::preview_type(b"not a pax file\n"),
        Err(PaxError::InvalidTag { .. })
    ));
}

#[test]
fn test_preview_header_resumes_with_more_bytes() {
    let bytes = sample_bytes();
    let header_len = {
        let text = String::from_utf8_lossy(&bytes);
        text.find("DATA_LENGTH").unwrap()
            + bytes[text.find("DATA_LENGTH").unwrap()..]
                .iter()
                .position(|&b| b == b'\n')
                .unwrap()
            + 1
    };

    // feed the header in growing chunks, as a streaming reader would
    let mut fed = 24;
    loop {
        match RasterFile::preview_header(&bytes[..fed]) {
            Ok(header) => {
                assert_eq!(header.raster_type, RasterType::Float);
                assert_eq!(header.data_length, 16);
                assert!(fed >= header_len);
                break;
            }
            Err(PaxError::Incomplete) => {
                assert!(fed < bytes.len(), "never completed");
                fed = (fed + 16).min(bytes.len());
            }
            Err(other) => panic!("unexpected error mid-stream: {other}"),
        }
    }
}

#[test]
fn test_payload_shorter_than_data_length() {
    let bytes = sample_bytes();
    let truncated = &bytes[..bytes.len() - 10];
    assert!(matches!(
        RasterFile::from_bytes(truncated),
        Err(PaxError::BufferTooShort { expected: 16, available: 6 })
    ));
}

#[test]
fn test_no_partial_raster_on_failure() {
    let bytes = sample_bytes();
    let mut raster = RasterFile::with_data(RasterType::Uchar, 1, 1, &[77u8]).unwrap();
    raster.import(&bytes[..bytes.len() - 10]).unwrap_err();
    // the old state survives a failed import untouched
    assert_eq!(raster.raster_type(), RasterType::Uchar);
    assert_eq!(raster.element::<u8>(0, 0).unwrap(), 77);
}

#[test]
fn test_hex_metadata_value() {
    let extended = edit_header(
        &sample_bytes(),
        "BYTES_PER_VALUE",
        "## [double]   crc32_checksum = 0xFB29C8B3\nBYTES_PER_VALUE",
    );
    let raster = RasterFile::from_bytes(&extended).unwrap();
    assert_eq!(
        raster.get_meta::<f64>("crc32_checksum").unwrap(),
        4213819571.0
    );
}

#[test]
fn test_file_io_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.pax");

    let bytes = sample_bytes();
    let original = RasterFile::from_bytes(&bytes).unwrap();
    original.write_to_path(&path).unwrap();

    assert_eq!(
        RasterFile::preview_type_of_path(&path).unwrap(),
        RasterType::Float
    );

    let reread = RasterFile::from_path(&path).unwrap();
    assert_eq!(reread.element::<f32>(0, 1).unwrap(), 160.06989);
    assert_eq!(reread.get_meta::<f32>("pi").unwrap(), 3.1416);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        RasterFile::from_path(dir.path().join("absent.pax")),
        Err(PaxError::Io(_))
    ));
}
