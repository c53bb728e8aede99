use rand::{distributions::Alphanumeric, Rng};

fn random_suffix(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// `<unix-millis>-<random>.<ext>`, unique enough for concurrent uploads
/// landing in the same directory.
pub fn upload_file_name(extension: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = random_suffix(8);
    if extension.is_empty() {
        format!("{millis}-{suffix}")
    } else {
        format!("{millis}-{suffix}.{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_suffix_has_requested_length() {
        let s = random_suffix(10);
        assert_eq!(s.len(), 10);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn upload_names_keep_extension() {
        assert!(upload_file_name("png").ends_with(".png"));
        assert!(!upload_file_name("").contains('.'));
        assert_ne!(upload_file_name("png"), upload_file_name("png"));
    }
}
