//! # Recursos Thread-Affine
//! src/jobs/affine.rs
//!
//! Un `ThreadBound<T>` guarda un valor que solo es válido en el thread que lo
//! creó (por ejemplo un handle de ventana nativa creado en el worker `Window`).
//! El valor se puede mover entre threads, pero solo el dueño puede usarlo.

use crate::jobs::error::{JobError, JobResult};
use std::thread::{self, ThreadId};

/// Valor accesible únicamente desde su thread dueño
#[derive(Debug)]
pub struct ThreadBound<T> {
    owner: ThreadId,
    value: T,
}

impl<T> ThreadBound<T> {
    /// Liga `value` al thread actual
    pub fn new(value: T) -> Self {
        Self {
            owner: thread::current().id(),
            value,
        }
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Verifica si el thread actual es el dueño
    pub fn is_owner(&self) -> bool {
        thread::current().id() == self.owner
    }

    pub fn get(&self) -> JobResult<&T> {
        self.check_owner()?;
        Ok(&self.value)
    }

    pub fn get_mut(&mut self) -> JobResult<&mut T> {
        self.check_owner()?;
        Ok(&mut self.value)
    }

    /// Recupera el valor; también exige estar en el thread dueño
    pub fn into_inner(self) -> JobResult<T> {
        self.check_owner()?;
        Ok(self.value)
    }

    fn check_owner(&self) -> JobResult<()> {
        if self.is_owner() {
            Ok(())
        } else {
            Err(JobError::WrongThread)
        }
    }
}
