/// Conservative host-name rule shared by the syntax check and the MX filter:
/// at least two dot-separated labels of 1..=63 letters, digits or hyphens,
/// none starting or ending with '-', and a final label of at least 2 chars.
pub(crate) fn is_valid_hostname(host: &str) -> bool {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let Some(last) = labels.last() else {
        return false;
    };
    if last.len() < 2 {
        return false;
    }
    labels.iter().all(|label| is_valid_label(label))
}

fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }
    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }
    label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}
