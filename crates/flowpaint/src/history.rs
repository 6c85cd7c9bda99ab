//! Undo/redo history over explicit diff payloads

use std::collections::VecDeque;

use thiserror::Error;
use tracing::{debug, info};

use crate::constants::MAX_HISTORY;
use crate::field::{FieldError, FlowField};
use crate::params::{ParamError, ParamKey, ParamValue, ParameterRegistry};
use crate::session::StrokeDiff;
use crate::types::DirtyRect;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Field snapshot no longer fits: {0}")]
    Field(#[from] FieldError),
    #[error("Parameter write failed: {0}")]
    Param(#[from] ParamError),
}

/// What a command operates on
pub trait CommandTarget {
    fn field_mut(&mut self) -> &mut FlowField;
    fn registry_mut(&mut self) -> &mut dyn ParameterRegistry;
}

/// An undoable change
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Field change from a stroke or a whole-field operation
    Stroke(StrokeDiff),
    /// Committed parameter change
    Parameter {
        key: ParamKey,
        old: ParamValue,
        new: ParamValue,
    },
}

impl Command {
    /// Apply the command's forward state. Returns field regions touched.
    pub fn execute(&self, target: &mut dyn CommandTarget) -> Result<Vec<DirtyRect>, HistoryError> {
        match self {
            Command::Stroke(diff) => Ok(diff.reapply(target.field_mut())?),
            Command::Parameter { key, new, .. } => {
                target.registry_mut().apply(*key, *new, false)?;
                Ok(Vec::new())
            }
        }
    }

    pub fn undo(&self, target: &mut dyn CommandTarget) -> Result<Vec<DirtyRect>, HistoryError> {
        match self {
            Command::Stroke(diff) => Ok(diff.revert(target.field_mut())?),
            Command::Parameter { key, old, .. } => {
                target.registry_mut().apply(*key, *old, false)?;
                Ok(Vec::new())
            }
        }
    }

    pub fn redo(&self, target: &mut dyn CommandTarget) -> Result<Vec<DirtyRect>, HistoryError> {
        self.execute(target)
    }
}

/// Bounded undo/redo stacks
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<Command>,
    redo_stack: Vec<Command>,
    max_history: usize,
    /// Value a parameter had before the current run of transient writes
    drag_origin: Option<(ParamKey, ParamValue)>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

impl History {
    pub fn new(max_history: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_history: max_history.max(1),
            drag_origin: None,
        }
    }

    /// Record a command whose effect is already in place
    pub fn push(&mut self, command: Command) {
        self.undo_stack.push_back(command);
        if self.undo_stack.len() > self.max_history {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
        debug!(
            "History::push: undo={}, redo={}",
            self.undo_stack.len(),
            self.redo_stack.len()
        );
    }

    /// Run a command and record it
    pub fn execute(
        &mut self,
        command: Command,
        target: &mut dyn CommandTarget,
    ) -> Result<Vec<DirtyRect>, HistoryError> {
        let rects = command.execute(target)?;
        self.push(command);
        Ok(rects)
    }

    /// Undo the latest command. Ok(None) when there is nothing to undo.
    ///
    /// A command that fails to undo stays on the undo stack.
    pub fn undo(&mut self, target: &mut dyn CommandTarget) -> Result<Option<Vec<DirtyRect>>, HistoryError> {
        let Some(command) = self.undo_stack.pop_back() else {
            debug!("History::undo: nothing to undo");
            return Ok(None);
        };
        match command.undo(target) {
            Ok(rects) => {
                self.redo_stack.push(command);
                Ok(Some(rects))
            }
            Err(err) => {
                self.undo_stack.push_back(command);
                Err(err)
            }
        }
    }

    /// Redo the latest undone command. Ok(None) when there is nothing to redo.
    pub fn redo(&mut self, target: &mut dyn CommandTarget) -> Result<Option<Vec<DirtyRect>>, HistoryError> {
        let Some(command) = self.redo_stack.pop() else {
            debug!("History::redo: nothing to redo");
            return Ok(None);
        };
        match command.redo(target) {
            Ok(rects) => {
                self.undo_stack.push_back(command);
                Ok(Some(rects))
            }
            Err(err) => {
                self.redo_stack.push(command);
                Err(err)
            }
        }
    }

    /// Write a parameter through the registry.
    ///
    /// Transient writes (drag previews) are applied without recording. The
    /// next committed write of the same key records the change from the value
    /// held before the drag started.
    pub fn apply_parameter(
        &mut self,
        target: &mut dyn CommandTarget,
        key: ParamKey,
        value: ParamValue,
        transient: bool,
    ) -> Result<(), HistoryError> {
        let current = target.registry_mut().read(key)?;
        if transient {
            if !matches!(self.drag_origin, Some((k, _)) if k == key) {
                self.drag_origin = Some((key, current));
            }
            target.registry_mut().apply(key, value, true)?;
            return Ok(());
        }

        let old = match self.drag_origin.take() {
            Some((k, origin)) if k == key => origin,
            _ => current,
        };
        target.registry_mut().apply(key, value, false)?;
        let new = target.registry_mut().read(key)?;
        if old != new {
            self.push(Command::Parameter { key, old, new });
        }
        Ok(())
    }

    #[inline]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    #[inline]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.drag_origin = None;
        info!("History::clear");
    }
}
