//! Export buffers and the per-kind slots that hold them.

use crate::protocol::AnalysisKind;

/// Raw bytes of an engine-encoded spreadsheet.
///
/// Not `Clone`: a buffer is moved from the engine into the front end and
/// only read from there.
#[derive(Debug, PartialEq, Eq)]
pub struct ExportBuffer(Vec<u8>);

impl ExportBuffer {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for ExportBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// At most one buffer per analysis kind; a new result replaces the old one.
#[derive(Debug, Default)]
pub struct ExportSlots {
    slots: [Option<ExportBuffer>; 3],
}

impl ExportSlots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, kind: AnalysisKind) -> Option<&ExportBuffer> {
        self.slots[kind.index()].as_ref()
    }

    /// Store `buffer`, returning the one it replaced.
    pub fn replace(&mut self, kind: AnalysisKind, buffer: ExportBuffer) -> Option<ExportBuffer> {
        self.slots[kind.index()].replace(buffer)
    }

    pub fn clear(&mut self) {
        self.slots = Default::default();
    }

    #[must_use]
    pub fn has(&self, kind: AnalysisKind) -> bool {
        self.get(kind).is_some()
    }
}
