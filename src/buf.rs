use std::cmp;
use std::io::{Error, ErrorKind, Read, Write};

pub fn fill_buf<R: Read>(data: &mut R, buf: &mut [u8]) -> std::io::Result<(bool, usize)> {
    let mut buf_read = 0;

    while buf_read < buf.len() {
        match data.read(&mut buf[buf_read..]) {
            Ok(0) => return Ok((true, buf_read)),
            Ok(x) => buf_read += x,
            Err(e) => return Err(e),
        };
    }
    Ok((false, buf_read))
}

// Copy exactly len bytes, a short source is an UnexpectedEof
pub fn copy_exact<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    len: u64,
) -> std::io::Result<()> {
    let mut buf = [0u8; 8 * 1024];
    let mut remain = len;

    while remain > 0 {
        let want = cmp::min(remain, buf.len() as u64) as usize;
        let (_, got) = fill_buf(reader, &mut buf[..want])?;

        if got == 0 {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                format!("short read, {} bytes missing", remain),
            ));
        }

        writer.write_all(&buf[..got])?;
        remain -= got as u64;
    }
    Ok(())
}

pub fn streams_equal<A: Read, B: Read>(a: &mut A, b: &mut B) -> std::io::Result<bool> {
    let mut a_buf = [0u8; 8 * 1024];
    let mut b_buf = [0u8; 8 * 1024];

    loop {
        let (_, a_len) = fill_buf(a, &mut a_buf)?;
        let (_, b_len) = fill_buf(b, &mut b_buf)?;

        if a_len != b_len || a_buf[..a_len] != b_buf[..b_len] {
            return Ok(false);
        }

        // A partial fill means both streams hit their end
        if a_len < a_buf.len() {
            return Ok(true);
        }
    }
}


#[cfg(test)]
mod test_copy_exact {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn whole_stream() {
        let mut in_buf = Cursor::new(vec![1, 2, 3, 4]);
        let mut out_buf = Vec::new();

        copy_exact(&mut in_buf, &mut out_buf, 4).unwrap();
        assert_eq!(&out_buf[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn partial_stream() {
        let mut in_buf = Cursor::new(vec![1, 2, 3, 4]);
        let mut out_buf = Vec::new();

        copy_exact(&mut in_buf, &mut out_buf, 2).unwrap();
        assert_eq!(&out_buf[..], &[1, 2]);

        // Remainder stays in the source
        let mut rest = Vec::new();
        in_buf.read_to_end(&mut rest).unwrap();
        assert_eq!(&rest[..], &[3, 4]);
    }

    #[test]
    fn zero_bytes() {
        let mut in_buf = Cursor::new(vec![1, 2]);
        let mut out_buf = Vec::new();

        copy_exact(&mut in_buf, &mut out_buf, 0).unwrap();
        assert!(out_buf.is_empty());
    }

    #[test]
    fn short_source() {
        let mut in_buf = Cursor::new(vec![1, 2]);
        let mut out_buf = Vec::new();

        let err = copy_exact(&mut in_buf, &mut out_buf, 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}
