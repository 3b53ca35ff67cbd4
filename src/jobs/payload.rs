//! # Payload de un Job
//! src/jobs/payload.rs
//!
//! Copia por valor de los datos del caller. Los payloads pequeños (structs de
//! parámetros) viven en un buffer inline; los grandes pasan al heap.
//!
//! El acceso tipado codifica los valores con MessagePack, así que cualquier
//! tipo `Serialize`/`Deserialize` sirve como struct de parámetros/resultados.

use crate::jobs::error::JobResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;

/// Bytes que caben sin reservar memoria en el heap
pub const INLINE_PAYLOAD_CAPACITY: usize = 64;

/// Buffer de datos propiedad exclusiva de un job
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Payload {
    bytes: SmallVec<[u8; INLINE_PAYLOAD_CAPACITY]>,
}

impl Payload {
    /// Payload vacío (jobs sin datos)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Copia `bytes`; el slice original no se vuelve a referenciar
    pub fn copy_from(bytes: &[u8]) -> Self {
        Self {
            bytes: SmallVec::from_slice(bytes),
        }
    }

    /// Codifica un valor tipado como payload
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> JobResult<Self> {
        let mut payload = Self::empty();
        payload.store(value)?;
        Ok(payload)
    }

    /// Decodifica el contenido como `T`
    pub fn decode<T: DeserializeOwned>(&self) -> JobResult<T> {
        Ok(rmp_serde::from_slice(&self.bytes)?)
    }

    /// Reemplaza el contenido con la codificación de `value`
    pub fn store<T: Serialize + ?Sized>(&mut self, value: &T) -> JobResult<()> {
        self.bytes.clear();
        rmp_serde::encode::write(&mut self.bytes, value)?;
        Ok(())
    }

    /// Reemplaza el contenido con una copia de `bytes`
    pub fn replace_bytes(&mut self, bytes: &[u8]) {
        self.bytes.clear();
        self.bytes.extend_from_slice(bytes);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `true` mientras el buffer no haya reservado memoria en el heap
    pub fn is_inline(&self) -> bool {
        !self.bytes.spilled()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("len", &self.len())
            .field("inline", &self.is_inline())
            .finish()
    }
}
