/// Splits raw bytes into lines on `\n`, dropping the terminator and a single
/// `\r` before it. A trailing segment without a newline is still a line.
/// Invalid UTF-8 is replaced rather than rejected.
pub fn split_lines(data: &[u8]) -> Vec<String> {
    let mut lines = Vec::with_capacity(count_lines(data));
    let mut start = 0;

    for (i, &byte) in data.iter().enumerate() {
        if byte == b'\n' {
            lines.push(to_line(&data[start..i]));
            start = i + 1;
        }
    }
    if start < data.len() {
        lines.push(to_line(&data[start..]));
    }

    lines
}

/// Number of lines `split_lines` would produce for `data`.
pub fn count_lines(data: &[u8]) -> usize {
    let partial = usize::from(data.last().is_some_and(|&b| b != b'\n'));
    count_newlines(data) + partial
}

pub fn count_newlines(data: &[u8]) -> usize {
    data.iter().filter(|&&b| b == b'\n').count()
}

fn to_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
