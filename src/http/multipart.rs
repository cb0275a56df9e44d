//! Reading `multipart/form-data` bodies
//!
//! Parsing is delegated to `multer`. Text parts become form values and file
//! parts are spooled into [`File`]s.

use axum::body::Body;

use crate::config::UploadConfig;
use crate::decode::FormValues;
use crate::error::Result;
use crate::http::file::{File, Spool};

/// The values and files of a submitted form.
#[derive(Debug, Default)]
pub(crate) struct FormData {
    pub(crate) values: FormValues,
    files: Vec<File>,
}

impl From<FormValues> for FormData {
    fn from(values: FormValues) -> Self {
        Self {
            values,
            files: Vec::new(),
        }
    }
}

impl FormData {
    pub(crate) async fn read_multipart(body: Body, boundary: String, config: &UploadConfig) -> Result<Self> {
        let mut multipart = multer::Multipart::new(body.into_data_stream(), boundary);
        let mut form = Self::default();

        while let Some(mut field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let text = field.text().await?;
                form.values.append(name, text);
                continue;
            };

            let mut spool = Spool::new(config);
            while let Some(chunk) = field.chunk().await? {
                spool.push(chunk).await?;
            }
            // browsers send an empty part for a file input left blank
            if let Some(file) = spool.finish(name, Some(file_name)).await? {
                form.files.push(file);
            }
        }

        tracing::debug!(
            values = form.values.iter().count(),
            files = form.files.len(),
            "Parsed multipart form"
        );
        Ok(form)
    }

    /// Take every file submitted under `field`, in submission order.
    pub(crate) fn take_files(&mut self, field: &str) -> Vec<File> {
        let (taken, rest): (Vec<File>, Vec<File>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|f| f.field() == field);
        self.files = rest;
        taken
    }
}
