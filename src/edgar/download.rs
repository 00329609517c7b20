use crate::domain::model::DocumentRequest;
use crate::domain::ports::{FilingsSource, Storage};
use crate::utils::error::{ProbeError, Result};

/// Fetch one archive document and save it through `storage`.
///
/// Nothing is written unless the whole body was received with a 2xx status. There is
/// no retry and no cleanup of earlier partial writes.
pub async fn download_document<F, S>(source: &F, storage: &S, request: &DocumentRequest) -> Result<String>
where
    F: FilingsSource + ?Sized,
    S: Storage,
{
    let url = source.document_url_for(request);
    tracing::info!("Attempting to download document from: {}", url);

    let body = match source.download(request).await {
        Ok(body) => body,
        Err(e @ ProbeError::HttpStatus { .. }) => {
            tracing::error!("HTTP error occurred: {}", e);
            return Err(e);
        }
        Err(ProbeError::Http(e)) => {
            tracing::error!("Request error occurred: {} - URL: {}", e, url);
            return Err(ProbeError::Http(e));
        }
        Err(e) => {
            tracing::error!("An unexpected error occurred: {} - URL: {}", e, url);
            return Err(e);
        }
    };

    storage.write_file(&request.save_path, &body).await?;
    tracing::info!(
        "Document downloaded successfully: {} ({} bytes)",
        request.save_path,
        body.len()
    );
    Ok(request.save_path.clone())
}
