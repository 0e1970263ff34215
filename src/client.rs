use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use async_stream::try_stream;
use futures::stream::BoxStream;
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::{debug, info};
use url::Url;

use crate::error::UploadError;
use crate::plan::{PartSpec, UploadPlan, plan_for_file};
use crate::rest_types::{
    FileRef, FileUploadInfo, PartUrlRequest, PartUrlResponse, PresignedData, UploadRequestPayload,
    UploadRequestResponse, UploadResult, VerifyRequest,
};

const UPLOAD_REQUEST_ROUTE: &str = "api/v1/upload/request";
const UPLOAD_VERIFY_ROUTE: &str = "api/v1/upload/verify";
const MULTIPART_PART_ROUTE: &str = "api/v1/upload/request/multipart";
const MULTIPART_EXPANSION_PART_ROUTE: &str = "api/v1/upload/request/multipart/expansion";

/// One upload job: which files to push and the metadata recorded on the
/// resulting build. File paths are resolved against the workspace root.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub workspace: PathBuf,
    pub primary_file: PathBuf,
    pub expansion_file: Option<PathBuf>,
    pub version_label: String,
    pub platform: Option<String>,
    pub stream: Option<String>,
    pub labels: Vec<String>,
    pub notes: Option<String>,
}

impl UploadJob {
    fn primary_path(&self) -> PathBuf {
        self.workspace.join(&self.primary_file)
    }

    fn expansion_path(&self) -> Option<PathBuf> {
        self.expansion_file.as_ref().map(|p| self.workspace.join(p))
    }
}

#[derive(Clone, Debug, Default)]
pub struct UploadProgress {
    pub bytes_uploaded: u64,
    pub total_bytes: u64,
}

#[derive(Debug)]
pub enum UploadEvent {
    Progress(UploadProgress),
    Complete(UploadResult),
}

pub struct BuildstashClient {
    client: Client,
    base_url: Url,
    auth_token: String,
}

impl BuildstashClient {
    pub fn new(base_url: Url, auth_token: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            auth_token,
        }
    }

    fn endpoint(&self, route: &str) -> Url {
        self.base_url
            .join(route)
            .expect("API route joins onto the base URL")
    }

    /// Runs one upload job to completion: request upload URLs, push the
    /// primary file (direct or chunked), push the expansion file if both
    /// the job and the server call for one, then verify.
    ///
    /// The returned stream yields progress events while bytes move and
    /// ends with `UploadEvent::Complete` carrying the verified build
    /// record. The first error terminates the stream; no step is retried
    /// and no later step runs.
    pub fn upload_build<'a>(
        &'a self,
        job: &'a UploadJob,
    ) -> Result<BoxStream<'a, Result<UploadEvent, UploadError>>, UploadError> {
        let primary_path = job.primary_path();
        let primary_size = std::fs::metadata(&primary_path)?.len();

        let expansion = match job.expansion_path() {
            Some(path) => {
                let size = std::fs::metadata(&path)?.len();
                Some((path, size))
            }
            None => None,
        };

        let payload = UploadRequestPayload {
            version_label: job.version_label.clone(),
            platform: job.platform.clone(),
            stream: job.stream.clone(),
            labels: job.labels.clone(),
            notes: job.notes.clone(),
            primary_file: FileRef {
                filename: file_name(&primary_path)?,
                size_bytes: primary_size,
            },
            expansion_files: match &expansion {
                Some((path, size)) => vec![FileRef {
                    filename: file_name(path)?,
                    size_bytes: *size,
                }],
                None => Vec::new(),
            },
        };

        let stream = try_stream! {
            yield UploadEvent::Progress(UploadProgress {
                bytes_uploaded: 0,
                total_bytes: primary_size + expansion.as_ref().map_or(0, |(_, size)| *size),
            });

            info!("requesting upload URLs from Buildstash");
            let response = self.request_upload_urls(&payload).await?;
            let pending_upload_id = response.pending_upload_id.clone();

            let mut files: Vec<(PathBuf, u64, &FileUploadInfo, bool)> =
                vec![(primary_path, primary_size, &response.primary_file, false)];

            // The expansion file is only uploaded when the job supplies one
            // AND the server handed back a descriptor for it.
            let expansion_info = response
                .expansion_files
                .as_ref()
                .and_then(|descriptors| descriptors.first());
            if let (Some((path, size)), Some(descriptor)) = (&expansion, expansion_info) {
                files.push((path.clone(), *size, descriptor, true));
            }

            let total_bytes: u64 = files.iter().map(|(_, size, _, _)| *size).sum();
            let mut bytes_uploaded = 0u64;

            for (path, size, descriptor, is_expansion) in files {
                let label = if is_expansion { "expansion file" } else { "primary file" };
                match plan_for_file(size, descriptor)? {
                    UploadPlan::Direct => {
                        info!("uploading {label} using direct upload");
                        let presigned = descriptor.presigned_data.as_ref().ok_or_else(|| {
                            UploadError::Plan(format!(
                                "direct upload of the {label} declared without presigned data"
                            ))
                        })?;
                        self.upload_direct(&path, presigned).await?;
                        bytes_uploaded += size;
                        yield UploadEvent::Progress(UploadProgress { bytes_uploaded, total_bytes });
                    }
                    UploadPlan::Chunked(parts) => {
                        info!("uploading {label} using chunked upload");
                        let count = parts.len();
                        for part in parts {
                            info!("uploading {label} part {} of {}", part.part_number, count);
                            let destination = self
                                .request_part_url(&pending_upload_id, is_expansion, &part)
                                .await?;
                            self.upload_part(&path, &destination.part_presigned_url, &part)
                                .await?;
                            bytes_uploaded += part.content_length;
                            yield UploadEvent::Progress(UploadProgress { bytes_uploaded, total_bytes });
                        }
                    }
                }
            }

            info!("verifying upload");
            let result = self.verify_upload(&pending_upload_id).await?;
            yield UploadEvent::Complete(result);
        };

        Ok(Box::pin(stream))
    }

    async fn request_upload_urls(
        &self,
        payload: &UploadRequestPayload,
    ) -> Result<UploadRequestResponse, UploadError> {
        let response = self
            .client
            .post(self.endpoint(UPLOAD_REQUEST_ROUTE))
            .bearer_auth(&self.auth_token)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UploadError::Request {
                status: response.status(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }

    async fn request_part_url(
        &self,
        pending_upload_id: &str,
        is_expansion: bool,
        part: &PartSpec,
    ) -> Result<PartUrlResponse, UploadError> {
        let route = if is_expansion {
            MULTIPART_EXPANSION_PART_ROUTE
        } else {
            MULTIPART_PART_ROUTE
        };
        let request = PartUrlRequest {
            pending_upload_id: pending_upload_id.to_string(),
            part_number: part.part_number,
            content_length: part.content_length,
        };

        let response = self
            .client
            .post(self.endpoint(route))
            .bearer_auth(&self.auth_token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UploadError::Request {
                status: response.status(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }

    async fn upload_direct(
        &self,
        path: &Path,
        presigned: &PresignedData,
    ) -> Result<(), UploadError> {
        let body = std::fs::read(path)?;
        debug!(bytes = body.len(), "direct upload body read");

        let mut request = self.client.put(&presigned.url);
        for (name, value) in &presigned.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.body(body).send().await?;
        if !response.status().is_success() {
            return Err(UploadError::Upload {
                status: response.status(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }

    async fn upload_part(
        &self,
        path: &Path,
        url: &str,
        part: &PartSpec,
    ) -> Result<(), UploadError> {
        let body = read_file_range(path, part.byte_start, part.content_length)?;
        debug!(
            part = part.part_number,
            start = part.byte_start,
            end = part.byte_end,
            "uploading byte range"
        );

        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, part.content_length)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UploadError::Upload {
                status: response.status(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }

    async fn verify_upload(&self, pending_upload_id: &str) -> Result<UploadResult, UploadError> {
        let request = VerifyRequest {
            pending_upload_id: pending_upload_id.to_string(),
        };

        let response = self
            .client
            .post(self.endpoint(UPLOAD_VERIFY_ROUTE))
            .bearer_auth(&self.auth_token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UploadError::Request {
                status: response.status(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }
}

/// Reads exactly `content_length` bytes starting at `byte_start`. The
/// buffer is sized up front, so the request body can never carry more or
/// fewer bytes than the plan calls for; a file shorter than the plan
/// expects surfaces as an I/O error naming the offset.
fn read_file_range(path: &Path, byte_start: u64, content_length: u64) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(byte_start))?;
    let mut buffer = vec![0u8; content_length as usize];
    file.read_exact(&mut buffer).map_err(|source| {
        io::Error::new(
            source.kind(),
            format!(
                "{} is shorter than planned at offset {}: {}",
                path.display(),
                byte_start,
                source
            ),
        )
    })?;
    Ok(buffer)
}

fn file_name(path: &Path) -> Result<String, UploadError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            UploadError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no file name in path {}", path.display()),
            ))
        })
}
