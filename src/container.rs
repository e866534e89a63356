use crate::compose::RenderedPage;
use crate::error::DocPressError;
use crate::types::Resolution;
use sha2::{Digest, Sha256};

/// `"DOC "` in little-endian byte order.
pub const CONTAINER_MAGIC: u32 = 0x2043_4F44;
pub const CONTAINER_VERSION: u32 = 0x0001_0000;
/// The in-game viewer indexes pages with three digits.
pub const MAX_PAGES: usize = 999;

pub(crate) const HEADER_LEN: usize = 0x20;
pub(crate) const TABLE_ENTRY_LEN: usize = 8;
pub(crate) const DIGEST_LEN: usize = 32;
pub(crate) const RECORD_ALIGN: usize = 16;

/// Serializes the rendered pages into the `DOCUMENT.DAT` byte layout:
/// a fixed header, a page table of offset/length pairs, then one image
/// record per page in global order. Each record is the PNG blob padded to a
/// 16-byte boundary followed by the SHA-256 digest of the unpadded blob.
/// The whole container is buffered; nothing touches the filesystem here.
pub fn pack(pages: &[RenderedPage], resolution: Resolution) -> Result<Vec<u8>, DocPressError> {
    if pages.is_empty() {
        return Err(DocPressError::Pack("no pages to pack".to_string()));
    }
    if pages.len() > MAX_PAGES {
        return Err(DocPressError::Pack(format!(
            "{} pages exceed the {} page format limit",
            pages.len(),
            MAX_PAGES
        )));
    }
    for page in pages {
        if page.width != resolution.width() || page.height != resolution.height() {
            return Err(DocPressError::Pack(format!(
                "page {} raster is {}x{}, container is {}",
                page.index, page.width, page.height, resolution
            )));
        }
    }

    let table_offset = HEADER_LEN;
    let data_offset = table_offset + pages.len() * TABLE_ENTRY_LEN;

    let mut out = Vec::with_capacity(
        data_offset + pages.iter().map(|p| record_len(p.png.len())).sum::<usize>(),
    );
    out.extend_from_slice(&CONTAINER_MAGIC.to_le_bytes());
    out.extend_from_slice(&CONTAINER_VERSION.to_le_bytes());
    out.extend_from_slice(&resolution.code().to_le_bytes());
    out.extend_from_slice(&(pages.len() as u32).to_le_bytes());
    out.extend_from_slice(&(table_offset as u32).to_le_bytes());
    out.extend_from_slice(&(data_offset as u32).to_le_bytes());
    out.extend_from_slice(&[0u8; 8]);

    let mut offset = data_offset;
    for page in pages {
        out.extend_from_slice(&(offset as u32).to_le_bytes());
        out.extend_from_slice(&(page.png.len() as u32).to_le_bytes());
        offset += record_len(page.png.len());
    }

    for page in pages {
        out.extend_from_slice(&page.png);
        let padding = padded_len(page.png.len()) - page.png.len();
        out.resize(out.len() + padding, 0);
        let digest = Sha256::digest(&page.png);
        out.extend_from_slice(&digest);
    }

    Ok(out)
}

pub(crate) fn padded_len(blob_len: usize) -> usize {
    blob_len.div_ceil(RECORD_ALIGN) * RECORD_ALIGN
}

pub(crate) fn record_len(blob_len: usize) -> usize {
    padded_len(blob_len) + DIGEST_LEN
}
