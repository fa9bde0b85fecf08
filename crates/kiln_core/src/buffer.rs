//! Per-load buffer residency.
//!
//! Buffers are fetched on first use and kept for the rest of the load.
//! Every accessor read goes through [`BufferStore`], which pairs the
//! accessor descriptor with its resolved bytes before handing both to the
//! decoder.

use std::io;
use std::sync::{Arc, OnceLock};

use base64::Engine;

use crate::accessor::{self, AccessorData};
use crate::error::{LoadError, LoadResult};
use crate::gltf::parser::Document;
use crate::resolver::{resolve_relative, PathResolver};

/// Memoized buffer bytes for one document.
pub struct BufferStore<'a> {
    document: &'a Document,
    document_path: &'a str,
    resolver: &'a dyn PathResolver,
    buffers: Vec<OnceLock<Arc<[u8]>>>,
}

impl<'a> BufferStore<'a> {
    pub fn new(document: &'a Document, document_path: &'a str, resolver: &'a dyn PathResolver) -> Self {
        let buffers = (0..document.root.buffers.len())
            .map(|_| OnceLock::new())
            .collect();

        Self {
            document,
            document_path,
            resolver,
            buffers,
        }
    }

    /// Bytes of buffer `index`, resolved on first request.
    pub fn get_buffer(&self, index: usize) -> LoadResult<Arc<[u8]>> {
        let buffer = self.document.buffer(index)?;
        let slot = &self.buffers[index];
        if let Some(bytes) = slot.get() {
            return Ok(Arc::clone(bytes));
        }

        let bytes: Arc<[u8]> = match buffer.uri.as_deref() {
            None | Some("") => match &self.document.blob {
                Some(blob) => Arc::clone(blob),
                None => {
                    return Err(LoadError::BufferUnavailable {
                        index,
                        uri: String::new(),
                        source: io::Error::new(
                            io::ErrorKind::NotFound,
                            "buffer has no uri and the document has no binary chunk",
                        ),
                    })
                }
            },
            Some(uri) => load_uri(self.resolver, self.document_path, uri)
                .map_err(|source| LoadError::BufferUnavailable {
                    index,
                    uri: display_uri(uri),
                    source,
                })?
                .into(),
        };

        if bytes.len() < buffer.byte_length {
            log::warn!(
                "Buffer {} is {} bytes, declared {}",
                index,
                bytes.len(),
                buffer.byte_length
            );
        }
        log::debug!("Loaded buffer {} ({} bytes)", index, bytes.len());

        // A concurrent caller may have won; keep whichever landed first
        Ok(Arc::clone(slot.get_or_init(|| bytes)))
    }

    /// Number of buffers resolved so far.
    pub fn resident_count(&self) -> usize {
        self.buffers.iter().filter(|slot| slot.get().is_some()).count()
    }

    /// Decode accessor `index`.
    pub fn accessor(&self, index: usize) -> LoadResult<AccessorData> {
        let accessor = self.document.accessor(index)?;
        match accessor.buffer_view {
            Some(view_index) => {
                let view = self.document.buffer_view(view_index)?;
                let bytes = self.get_buffer(view.buffer)?;
                accessor::decode(index, accessor, Some(view), &bytes)
            }
            None => accessor::decode(index, accessor, None, &[]),
        }
    }

    /// Decode accessor `index` as vertex indices.
    pub fn indices(&self, index: usize) -> LoadResult<Vec<u32>> {
        let accessor = self.document.accessor(index)?;
        match accessor.buffer_view {
            Some(view_index) => {
                let view = self.document.buffer_view(view_index)?;
                let bytes = self.get_buffer(view.buffer)?;
                accessor::decode_indices(index, accessor, Some(view), &bytes)
            }
            None => accessor::decode_indices(index, accessor, None, &[]),
        }
    }

    /// Copy the bytes covered by buffer view `index` (embedded images).
    pub fn view_bytes(&self, index: usize) -> LoadResult<Vec<u8>> {
        let view = self.document.buffer_view(index)?;
        let bytes = self.get_buffer(view.buffer)?;
        let end = view.byte_offset.saturating_add(view.byte_length);
        bytes
            .get(view.byte_offset..end)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                LoadError::InvalidDocument(format!(
                    "buffer view {} range {}..{} exceeds buffer {} ({} bytes)",
                    index,
                    view.byte_offset,
                    end,
                    view.buffer,
                    bytes.len()
                ))
            })
    }
}

/// Fetch a URI referenced by a document: inline `data:` payload or a path
/// resolved against the document's directory.
pub(crate) fn load_uri(resolver: &dyn PathResolver, document_path: &str, uri: &str) -> io::Result<Vec<u8>> {
    if let Some(rest) = uri.strip_prefix("data:") {
        return decode_data_uri(rest);
    }
    resolver.resolve(&resolve_relative(document_path, uri))
}

/// Decode the part of a data URI after `data:`.
fn decode_data_uri(rest: &str) -> io::Result<Vec<u8>> {
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "data uri has no payload"))?;

    if header.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    } else {
        Ok(urlencoding::decode_binary(payload.as_bytes()).into_owned())
    }
}

/// Data URIs can be megabytes long; keep error messages readable.
fn display_uri(uri: &str) -> String {
    if uri.starts_with("data:") {
        let header = uri.split(',').next().unwrap_or("data:");
        format!("{},...", header)
    } else {
        uri.to_string()
    }
}
