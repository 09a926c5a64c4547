pub fn extract_txt(bytes: &[u8]) -> String {
    let text = String::from_utf8(bytes.to_vec())
        .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned());
    text.trim_start_matches('\u{feff}').trim().to_string()
}
