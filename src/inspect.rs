use crate::container::{
    CONTAINER_MAGIC, CONTAINER_VERSION, DIGEST_LEN, HEADER_LEN, TABLE_ENTRY_LEN, padded_len,
};
use crate::error::DocPressError;
use crate::types::Resolution;
use sha2::{Digest, Sha256};

/// Parsed view of a container's header and page table, with every record
/// digest re-verified against its PNG blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerReport {
    pub version: u32,
    pub resolution: Resolution,
    pub page_count: usize,
    pub pages: Vec<PageRecordInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecordInfo {
    pub offset: usize,
    pub length: usize,
    pub digest_ok: bool,
}

/// Validates header, table, and record digests. Structural problems are
/// `Pack` errors with positional context; a wrong digest is reported per
/// page rather than failing the whole read.
pub fn inspect_container(bytes: &[u8]) -> Result<ContainerReport, DocPressError> {
    if bytes.len() < HEADER_LEN {
        return Err(DocPressError::Pack(format!(
            "container is {} bytes, shorter than the {} byte header",
            bytes.len(),
            HEADER_LEN
        )));
    }
    let magic = read_u32(bytes, 0x00);
    if magic != CONTAINER_MAGIC {
        return Err(DocPressError::Pack(format!(
            "bad magic 0x{magic:08X}, expected 0x{CONTAINER_MAGIC:08X}"
        )));
    }
    let version = read_u32(bytes, 0x04);
    if version != CONTAINER_VERSION {
        return Err(DocPressError::Pack(format!(
            "unsupported container version 0x{version:08X}"
        )));
    }
    let resolution_code = read_u32(bytes, 0x08);
    let resolution = Resolution::from_code(resolution_code).ok_or_else(|| {
        DocPressError::Pack(format!("unknown resolution code {resolution_code}"))
    })?;
    let page_count = read_u32(bytes, 0x0C) as usize;
    if page_count == 0 {
        return Err(DocPressError::Pack("container declares zero pages".to_string()));
    }
    let table_offset = read_u32(bytes, 0x10) as usize;
    let data_offset = read_u32(bytes, 0x14) as usize;
    let table_end = table_offset
        .checked_add(page_count.saturating_mul(TABLE_ENTRY_LEN))
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| {
            DocPressError::Pack(format!(
                "page table for {page_count} pages does not fit in {} bytes",
                bytes.len()
            ))
        })?;
    if table_offset != HEADER_LEN || data_offset != table_end {
        return Err(DocPressError::Pack(format!(
            "inconsistent layout: table at 0x{table_offset:X}, data at 0x{data_offset:X}"
        )));
    }

    let mut pages = Vec::with_capacity(page_count);
    for page_index in 0..page_count {
        let entry = table_offset + page_index * TABLE_ENTRY_LEN;
        let offset = read_u32(bytes, entry) as usize;
        let length = read_u32(bytes, entry + 4) as usize;
        let digest_start = offset
            .checked_add(padded_len(length))
            .filter(|start| start + DIGEST_LEN <= bytes.len())
            .ok_or_else(|| {
                DocPressError::Pack(format!(
                    "page {page_index} record at 0x{offset:X}+{length} overruns the container"
                ))
            })?;
        let blob = &bytes[offset..offset + length];
        let stored = &bytes[digest_start..digest_start + DIGEST_LEN];
        let digest_ok = Sha256::digest(blob).as_slice() == stored;
        pages.push(PageRecordInfo {
            offset,
            length,
            digest_ok,
        });
    }

    Ok(ContainerReport {
        version,
        resolution,
        page_count,
        pages,
    })
}

/// Returns the PNG blob of every page in global order. Fails on structural
/// problems or on any record whose digest does not match its blob.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<Vec<u8>>, DocPressError> {
    let report = inspect_container(bytes)?;
    let mut out = Vec::with_capacity(report.page_count);
    for (page_index, record) in report.pages.iter().enumerate() {
        if !record.digest_ok {
            return Err(DocPressError::Pack(format!(
                "page {page_index} record digest mismatch"
            )));
        }
        out.push(bytes[record.offset..record.offset + record.length].to_vec());
    }
    Ok(out)
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
