use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Opens a file for line reading, transparently peeling off GZIP/BGZF layers.
///
/// Compression is detected from the leading magic bytes rather than the
/// file extension, so `sumstats.tsv` that is secretly gzipped still works.
pub fn open_input(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    wrap_reader(BufReader::new(file))
}

/// Wraps an already-open reader, decompressing it when it starts with GZIP magic.
pub fn wrap_reader<R>(mut reader: R) -> io::Result<Box<dyn BufRead + Send>>
where
    R: BufRead + Send + 'static,
{
    let is_gzip = {
        let buf = reader.fill_buf()?;
        buf.len() >= 2 && buf[..2] == GZIP_MAGIC
    };

    if is_gzip {
        tracing::debug!("Detected GZIP/BGZF layer");
        // MultiGzDecoder also covers BGZF and concatenated members.
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read, Write};

    use flate2::{Compression, write::GzEncoder};

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn passes_plain_text_through() {
        let mut reader = wrap_reader(Cursor::new(b"SNP\tA1\n".to_vec())).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "SNP\tA1\n");
    }

    #[test]
    fn decompresses_gzip_by_magic() {
        let compressed = gzip(b"SNP\tA1\nrs1\tA\n");
        let mut reader = wrap_reader(Cursor::new(compressed)).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "SNP\tA1\nrs1\tA\n");
    }

    #[test]
    fn decompresses_concatenated_members() {
        let mut compressed = gzip(b"SNP\n");
        compressed.extend(gzip(b"rs1\n"));
        let mut reader = wrap_reader(Cursor::new(compressed)).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "SNP\nrs1\n");
    }

    #[test]
    fn empty_input_is_not_an_error() {
        let mut reader = wrap_reader(Cursor::new(Vec::new())).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
