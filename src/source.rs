use std::io::{self, BufRead};

/// Reads lines until one matches `sentinel` (trimmed, ignoring case) or the
/// input ends. The sentinel line itself is dropped.
pub fn read_until_sentinel<R: BufRead>(reader: R, sentinel: &str) -> io::Result<String> {
    let sentinel = sentinel.trim();
    let mut source = String::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().eq_ignore_ascii_case(sentinel) {
            break;
        }
        source.push_str(&line);
        source.push('\n');
    }
    Ok(source)
}
