use std::io::{self, BufRead};

#[derive(Debug, Clone)]
pub struct OutlineLine {
    pub text: String,
    /// 1-based line number in the outline file.
    pub number: usize,
}

impl OutlineLine {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

pub fn read_lines<R: BufRead>(reader: &mut R) -> io::Result<Vec<OutlineLine>> {
    let mut lines = Vec::new();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = reader.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }

        let mut text = buffer.clone();
        if text.ends_with('\n') {
            text.pop();

            if text.ends_with('\r') {
                text.pop();
            }
        }

        lines.push(OutlineLine {
            text,
            number: lines.len() + 1,
        });
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn strips_crlf_and_numbers_lines() {
        let mut reader = Cursor::new("Title\r\n\n# One");
        let lines = read_lines(&mut reader).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "Title");
        assert!(lines[1].is_blank());
        assert_eq!(lines[2].text, "# One");
        assert_eq!(lines[2].number, 3);
    }

    #[test]
    fn rejects_invalid_utf8() {
        let mut reader = Cursor::new(vec![b'T', 0xff, b'\n']);
        let err = read_lines(&mut reader).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
