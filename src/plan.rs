use crate::error::UploadError;
use crate::rest_types::FileUploadInfo;

/// One byte range of a chunked upload. Part numbers are 1-based and the
/// range bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSpec {
    pub part_number: u32,
    pub byte_start: u64,
    pub byte_end: u64,
    pub content_length: u64,
}

/// How a single file gets transferred: one presigned PUT, or an ordered
/// sequence of byte ranges that tile `[0, file_size)` exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPlan {
    Direct,
    Chunked(Vec<PartSpec>),
}

/// Turns the server's strategy descriptor into a concrete plan for a file
/// of `file_size` bytes.
///
/// The declared geometry must account for every byte exactly once: enough
/// parts to reach the end of the file, and no part left empty. Anything
/// else means the server and client disagree about the file and the job
/// must not start.
pub fn plan_for_file(file_size: u64, info: &FileUploadInfo) -> Result<UploadPlan, UploadError> {
    if !info.chunked_upload {
        return Ok(UploadPlan::Direct);
    }

    let chunk_size = info.chunked_part_size_mb * 1024 * 1024;
    let parts = info.chunked_number_parts;
    if chunk_size == 0 || parts == 0 {
        return Err(UploadError::Plan(format!(
            "server declared {} parts of {} MB",
            parts, info.chunked_part_size_mb
        )));
    }

    if u64::from(parts) * chunk_size < file_size {
        return Err(UploadError::Plan(format!(
            "{} parts of {} bytes cover only {} of {} bytes",
            parts,
            chunk_size,
            u64::from(parts) * chunk_size,
            file_size
        )));
    }
    if u64::from(parts - 1) * chunk_size >= file_size {
        return Err(UploadError::Plan(format!(
            "{} parts of {} bytes leave trailing empty parts for a {} byte file",
            parts, chunk_size, file_size
        )));
    }

    let specs = (0..u64::from(parts))
        .map(|i| {
            let byte_start = i * chunk_size;
            let byte_end = ((i + 1) * chunk_size).min(file_size) - 1;
            PartSpec {
                part_number: (i + 1) as u32,
                byte_start,
                byte_end,
                content_length: byte_end - byte_start + 1,
            }
        })
        .collect();

    Ok(UploadPlan::Chunked(specs))
}
