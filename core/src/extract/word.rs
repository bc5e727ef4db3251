//! Legacy Microsoft Word documents (Word 6 through Word 2003, `.doc`).
//!
//! A `.doc` file is an OLE2 compound file. The `WordDocument` stream starts
//! with the File Information Block (FIB). Word 97 and later keep the document
//! text in pieces described by a piece table (the CLX) stored in the `0Table`
//! or `1Table` stream; each piece is either UTF-16LE or "compressed" 8-bit
//! Windows-1252. Word 6/95 files without fast-save hold the text contiguously
//! between `fcMin` and `fcMac`.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use cfb::CompoundFile;
use encoding_rs::WINDOWS_1252;

use super::{has_extension, ExtractedDocument, Extractor};
use crate::error::ScanError;

const FIB_MAGIC: u16 = 0xA5EC;
const NFIB_WORD97: u16 = 0x00C1;

const FLAG_COMPLEX: u16 = 0x0004;
const FLAG_ENCRYPTED: u16 = 0x0100;
const FLAG_TABLE1: u16 = 0x0200;

const OFF_NFIB: usize = 0x02;
const OFF_FLAGS: usize = 0x0A;
const OFF_FC_MIN: usize = 0x18;
const OFF_FC_MAC: usize = 0x1C;
const OFF_CCP_TEXT_95: usize = 0x34;
const OFF_CCP_TEXT_97: usize = 0x4C;
const OFF_FC_CLX: usize = 0x1A2;
const OFF_LCB_CLX: usize = 0x1A6;

const FC_COMPRESSED: u32 = 0x4000_0000;

#[derive(Debug, Default, Clone, Copy)]
pub struct WordExtractor;

impl Extractor for WordExtractor {
    fn name(&self) -> &'static str {
        "word"
    }

    fn supports_file(&self, path: &Path) -> bool {
        has_extension(path, "doc")
    }

    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ScanError> {
        let file = File::open(path).map_err(|source| ScanError::Unreadable { path: path.to_path_buf(), source })?;
        let mut comp = CompoundFile::open(file)
            .map_err(|e| ScanError::malformed(path, format!("not an OLE2 compound file: {e}")))?;

        let text = read_document_text(&mut comp).map_err(|reason| ScanError::malformed(path, reason))?;
        let doc = ExtractedDocument::from_blocks(path, paragraphs(&text));
        tracing::trace!(path = %path.display(), title = %doc.title, blocks = doc.blocks.len(), "extracted word document");
        Ok(doc)
    }
}

fn read_document_text<F: Read + Seek>(comp: &mut CompoundFile<F>) -> Result<String, String> {
    let word = read_stream(comp, "/WordDocument")?;
    let fib = Fib::parse(&word)?;
    if fib.flags & FLAG_ENCRYPTED != 0 {
        return Err("encrypted documents are not supported".into());
    }

    if fib.n_fib >= NFIB_WORD97 {
        let table_name = if fib.flags & FLAG_TABLE1 != 0 { "/1Table" } else { "/0Table" };
        let table = read_stream(comp, table_name)?;
        let clx = slice(&table, fib.fc_clx as usize, fib.lcb_clx as usize).ok_or("CLX lies outside the table stream")?;
        let pieces = piece_table(clx)?;
        pieces_text(&word, &pieces, fib.ccp_text)
    } else if fib.flags & FLAG_COMPLEX == 0 {
        contiguous_text(&word, &fib)
    } else {
        Err("fast-saved Word 6/95 documents are not supported".into())
    }
}

fn read_stream<F: Read + Seek>(comp: &mut CompoundFile<F>, name: &str) -> Result<Vec<u8>, String> {
    if !comp.exists(name) {
        return Err(format!("missing {} stream", name.trim_start_matches('/')));
    }
    let mut stream = comp.open_stream(name).map_err(|e| format!("cannot open {name}: {e}"))?;
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).map_err(|e| format!("cannot read {name}: {e}"))?;
    Ok(buf)
}

/// The few FIB fields needed to locate the main document text.
#[derive(Debug)]
struct Fib {
    n_fib: u16,
    flags: u16,
    fc_min: u32,
    fc_mac: u32,
    ccp_text: u32,
    fc_clx: u32,
    lcb_clx: u32,
}

impl Fib {
    fn parse(word: &[u8]) -> Result<Self, String> {
        let short = || "WordDocument stream is too short for a FIB".to_string();
        if read_u16(word, 0).ok_or_else(short)? != FIB_MAGIC {
            return Err("bad FIB magic".into());
        }
        let n_fib = read_u16(word, OFF_NFIB).ok_or_else(short)?;
        let flags = read_u16(word, OFF_FLAGS).ok_or_else(short)?;
        let fc_min = read_u32(word, OFF_FC_MIN).ok_or_else(short)?;
        let fc_mac = read_u32(word, OFF_FC_MAC).ok_or_else(short)?;

        if n_fib >= NFIB_WORD97 {
            Ok(Self {
                n_fib,
                flags,
                fc_min,
                fc_mac,
                ccp_text: read_u32(word, OFF_CCP_TEXT_97).ok_or_else(short)?,
                fc_clx: read_u32(word, OFF_FC_CLX).ok_or_else(short)?,
                lcb_clx: read_u32(word, OFF_LCB_CLX).ok_or_else(short)?,
            })
        } else {
            Ok(Self {
                n_fib,
                flags,
                fc_min,
                fc_mac,
                ccp_text: read_u32(word, OFF_CCP_TEXT_95).ok_or_else(short)?,
                fc_clx: 0,
                lcb_clx: 0,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Piece {
    cp_start: u32,
    cp_end: u32,
    fc: u32,
}

fn piece_table(clx: &[u8]) -> Result<Vec<Piece>, String> {
    let truncated = || "truncated CLX".to_string();
    let mut pos = 0usize;
    while pos < clx.len() {
        match clx[pos] {
            // Prc: property modifiers, not needed for text
            0x01 => {
                let cb = read_u16(clx, pos + 1).ok_or_else(truncated)? as usize;
                pos += 3 + cb;
            }
            // Pcdt: the piece table itself
            0x02 => {
                let lcb = read_u32(clx, pos + 1).ok_or_else(truncated)? as usize;
                let plc = slice(clx, pos + 5, lcb).ok_or_else(truncated)?;
                return parse_plc_pcd(plc);
            }
            other => return Err(format!("unexpected CLX entry {other:#04x}")),
        }
    }
    Err("CLX has no piece table".into())
}

/// PlcPcd: n+1 character positions followed by n 8-byte piece descriptors.
fn parse_plc_pcd(plc: &[u8]) -> Result<Vec<Piece>, String> {
    if plc.len() < 4 || (plc.len() - 4) % 12 != 0 {
        return Err(format!("piece table has invalid length {}", plc.len()));
    }
    let n = (plc.len() - 4) / 12;
    let pcd_base = (n + 1) * 4;
    let mut pieces = Vec::with_capacity(n);
    for i in 0..n {
        let (Some(cp_start), Some(cp_end), Some(fc)) = (
            read_u32(plc, i * 4),
            read_u32(plc, (i + 1) * 4),
            read_u32(plc, pcd_base + i * 8 + 2),
        ) else {
            return Err("truncated piece table".into());
        };
        if cp_end < cp_start {
            return Err(format!("piece {i} ends before it starts"));
        }
        pieces.push(Piece { cp_start, cp_end, fc });
    }
    Ok(pieces)
}

/// Concatenate the pieces covering character positions `0..ccp_text`.
fn pieces_text(word: &[u8], pieces: &[Piece], ccp_text: u32) -> Result<String, String> {
    let mut out = String::new();
    for piece in pieces {
        if piece.cp_start >= ccp_text {
            break;
        }
        let count = (piece.cp_end.min(ccp_text) - piece.cp_start) as usize;
        if piece.fc & FC_COMPRESSED != 0 {
            let offset = ((piece.fc & !FC_COMPRESSED) / 2) as usize;
            let bytes = slice(word, offset, count).ok_or("text piece lies outside the document stream")?;
            out.push_str(&WINDOWS_1252.decode_without_bom_handling(bytes).0);
        } else {
            let bytes = slice(word, piece.fc as usize, count * 2).ok_or("text piece lies outside the document stream")?;
            let units = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]));
            out.extend(char::decode_utf16(units).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)));
        }
    }
    Ok(out)
}

fn contiguous_text(word: &[u8], fib: &Fib) -> Result<String, String> {
    if fib.fc_mac < fib.fc_min {
        return Err("fcMac precedes fcMin".into());
    }
    let len = ((fib.fc_mac - fib.fc_min) as usize).min(fib.ccp_text as usize);
    let bytes = slice(word, fib.fc_min as usize, len).ok_or("text lies outside the document stream")?;
    Ok(WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned())
}

/// Split raw document text into paragraphs, dropping field instructions,
/// control marks and blank paragraphs.
fn paragraphs(text: &str) -> Vec<String> {
    let mut paras = Vec::new();
    let mut current = String::new();
    // one entry per open field; true while inside its instruction part
    let mut fields: Vec<bool> = Vec::new();

    for ch in text.chars() {
        match ch {
            '\u{13}' => fields.push(true),
            '\u{14}' => {
                if let Some(in_instruction) = fields.last_mut() {
                    *in_instruction = false;
                }
            }
            '\u{15}' => {
                fields.pop();
            }
            _ if fields.last() == Some(&true) => {}
            '\r' | '\n' | '\u{7}' | '\u{b}' | '\u{c}' => paras.push(std::mem::take(&mut current)),
            '\t' => current.push('\t'),
            c if c.is_control() => {}
            c => current.push(c),
        }
    }
    paras.push(current);
    paras.retain(|p| !p.trim().is_empty());
    paras
}

fn slice(buf: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    buf.get(offset..offset.checked_add(len)?)
}

fn read_u16(buf: &[u8], offset: usize) -> Option<u16> {
    slice(buf, offset, 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    slice(buf, offset, 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    enum Text<'a> {
        Compressed(&'a str),
        Unicode(&'a str),
    }

    fn put_u16(buf: &mut [u8], off: usize, v: u16) {
        buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
    }

    fn put_u32(buf: &mut [u8], off: usize, v: u32) {
        buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
    }

    /// Lay out a minimal Word 97 file: FIB + text in `WordDocument`, CLX in `1Table`.
    fn write_word97(path: &Path, pieces: &[Text], ccp_text: u32) {
        let mut word = vec![0u8; 0x400];
        put_u16(&mut word, 0, FIB_MAGIC);
        put_u16(&mut word, OFF_NFIB, NFIB_WORD97);
        put_u16(&mut word, OFF_FLAGS, FLAG_TABLE1);
        put_u32(&mut word, OFF_CCP_TEXT_97, ccp_text);

        let mut cps = vec![0u32];
        let mut fcs = Vec::new();
        for piece in pieces {
            let start = word.len();
            let chars = match piece {
                Text::Compressed(s) => {
                    word.extend_from_slice(s.as_bytes());
                    fcs.push(((start as u32) * 2) | FC_COMPRESSED);
                    s.len() as u32
                }
                Text::Unicode(s) => {
                    let units: Vec<u16> = s.encode_utf16().collect();
                    for u in &units {
                        word.extend_from_slice(&u.to_le_bytes());
                    }
                    fcs.push(start as u32);
                    units.len() as u32
                }
            };
            cps.push(cps.last().unwrap() + chars);
        }

        let mut plc = Vec::new();
        for cp in &cps {
            plc.extend_from_slice(&cp.to_le_bytes());
        }
        for fc in &fcs {
            plc.extend_from_slice(&[0, 0]);
            plc.extend_from_slice(&fc.to_le_bytes());
            plc.extend_from_slice(&[0, 0]);
        }
        // a Prc entry first, to exercise skipping it
        let mut table = vec![0x01, 0x02, 0x00, 0xAA, 0xBB, 0x02];
        table.extend_from_slice(&(plc.len() as u32).to_le_bytes());
        table.extend_from_slice(&plc);
        put_u32(&mut word, OFF_FC_CLX, 0);
        put_u32(&mut word, OFF_LCB_CLX, table.len() as u32);

        write_streams(path, &[("/WordDocument", word.as_slice()), ("/1Table", table.as_slice())]);
    }

    fn write_streams(path: &Path, streams: &[(&str, &[u8])]) {
        let mut comp = cfb::create(path).unwrap();
        for (name, data) in streams {
            let mut s = comp.create_stream(name).unwrap();
            s.write_all(data).unwrap();
            s.flush().unwrap();
        }
        comp.flush().unwrap();
    }

    /// Word 6/95 layout: one 8-bit run between fcMin and fcMac, no piece table.
    fn write_word95(path: &Path, text: &str) {
        let fc_min = 0x200usize;
        let mut word = vec![0u8; fc_min];
        put_u16(&mut word, 0, FIB_MAGIC);
        put_u16(&mut word, OFF_NFIB, 0x0065);
        put_u32(&mut word, OFF_FC_MIN, fc_min as u32);
        put_u32(&mut word, OFF_FC_MAC, (fc_min + text.len()) as u32);
        put_u32(&mut word, OFF_CCP_TEXT_95, text.len() as u32);
        word.extend_from_slice(text.as_bytes());
        write_streams(path, &[("/WordDocument", word.as_slice())]);
    }

    #[test]
    fn reads_word95_contiguous_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tamales.doc");
        write_word95(&path, "Tamales\rmasa harina\r");

        let doc = WordExtractor.extract(&path).unwrap();
        assert_eq!(doc.title, "Tamales");
        assert_eq!(doc.blocks, vec!["Tamales", "masa harina"]);
    }

    #[test]
    fn encrypted_document_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locked.doc");
        let mut word = vec![0u8; 0x400];
        put_u16(&mut word, 0, FIB_MAGIC);
        put_u16(&mut word, OFF_NFIB, NFIB_WORD97);
        put_u16(&mut word, OFF_FLAGS, FLAG_ENCRYPTED | FLAG_TABLE1);
        write_streams(&path, &[("/WordDocument", word.as_slice()), ("/1Table", &[0u8; 16][..])]);

        match WordExtractor.extract(&path).unwrap_err() {
            ScanError::Malformed { reason, .. } => assert!(reason.contains("encrypted")),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn reads_paragraphs_from_mixed_pieces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Arroz con Gandules Recipe.doc");
        let first = "Arroz con Gandules Recipe\r2 cups rice\r";
        let second = "1 can gandules \u{13} HYPERLINK \"x\" \u{14}sofrito\u{15}\r";
        let ccp = (first.len() + second.encode_utf16().count()) as u32;
        write_word97(&path, &[Text::Compressed(first), Text::Unicode(second)], ccp);

        let doc = WordExtractor.extract(&path).unwrap();
        assert_eq!(doc.title, "Arroz con Gandules Recipe");
        assert_eq!(doc.blocks, vec!["Arroz con Gandules Recipe", "2 cups rice", "1 can gandules sofrito"]);
    }

    #[test]
    fn text_beyond_main_document_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flan.doc");
        let body = "Flan\r4 eggs\r";
        write_word97(&path, &[Text::Compressed(body), Text::Compressed("footnote text\r")], body.len() as u32);

        let doc = WordExtractor.extract(&path).unwrap();
        assert_eq!(doc.blocks, vec!["Flan", "4 eggs"]);
    }

    #[test]
    fn plain_bytes_are_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.doc");
        std::fs::write(&path, b"this is not a compound file").unwrap();
        let err = WordExtractor.extract(&path).unwrap_err();
        assert!(matches!(err, ScanError::Malformed { .. }));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = WordExtractor.extract(Path::new("/nonexistent/recipe.doc")).unwrap_err();
        assert!(matches!(err, ScanError::Unreadable { .. }));
    }

    #[test]
    fn bad_fib_magic_is_rejected() {
        assert!(Fib::parse(&[0u8; 0x200]).is_err());
        assert!(Fib::parse(&[0xEC]).is_err());
    }

    #[test]
    fn paragraphs_split_on_cell_and_line_marks() {
        let paras = paragraphs("Title\r\ra\u{7}b\u{b}c\u{1e}d\r  \r");
        assert_eq!(paras, vec!["Title", "a", "b", "cd"]);
    }
}
