use crate::draw::model::Annotation;

#[derive(Debug, Clone, PartialEq)]
pub enum RedoEntry {
    /// A single annotation taken off the committed list by undo.
    Annotation(Annotation),
    /// The whole committed list as it was before a clear. While this sits on
    /// top of the redo buffer the clear is the latest action.
    Cleared(Vec<Annotation>),
    /// A clear that was undone; redo applies it again.
    UndoneClear,
}

/// Linear undo/redo over the committed annotation list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrawHistory {
    committed: Vec<Annotation>,
    redo_stack: Vec<RedoEntry>,
}

impl DrawHistory {
    pub fn commit(&mut self, annotation: Annotation) {
        self.committed.push(annotation);
        self.redo_stack.clear();
    }

    /// Returns `true` when the committed list changed.
    pub fn undo(&mut self) -> bool {
        if let Some(annotation) = self.committed.pop() {
            self.redo_stack.push(RedoEntry::Annotation(annotation));
            return true;
        }
        if matches!(self.redo_stack.last(), Some(RedoEntry::Cleared(_))) {
            if let Some(RedoEntry::Cleared(batch)) = self.redo_stack.pop() {
                self.committed = batch;
                self.redo_stack.push(RedoEntry::UndoneClear);
                return true;
            }
        }
        false
    }

    pub fn redo(&mut self) -> bool {
        match self.redo_stack.last() {
            None | Some(RedoEntry::Cleared(_)) => false,
            Some(RedoEntry::Annotation(_)) => {
                if let Some(RedoEntry::Annotation(annotation)) = self.redo_stack.pop() {
                    self.committed.push(annotation);
                }
                true
            }
            Some(RedoEntry::UndoneClear) => {
                self.redo_stack.pop();
                let batch = std::mem::take(&mut self.committed);
                self.redo_stack.push(RedoEntry::Cleared(batch));
                true
            }
        }
    }

    /// Moves every committed annotation into the redo buffer as one batch.
    pub fn clear(&mut self) -> bool {
        if self.committed.is_empty() {
            return false;
        }
        let batch = std::mem::take(&mut self.committed);
        self.redo_stack.push(RedoEntry::Cleared(batch));
        true
    }

    /// Deletes without recording anything; erasing and deleting a selection
    /// cannot be undone.
    pub fn remove(&mut self, index: usize) -> Option<Annotation> {
        (index < self.committed.len()).then(|| self.committed.remove(index))
    }

    /// Removes every annotation matching `predicate`, returning how many went.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Annotation) -> bool,
    {
        let before = self.committed.len();
        self.committed.retain(|annotation| !predicate(annotation));
        before - self.committed.len()
    }

    pub fn committed(&self) -> &[Annotation] {
        &self.committed
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Annotation> {
        self.committed.get_mut(index)
    }

    pub fn redo_entries(&self) -> &[RedoEntry] {
        &self.redo_stack
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }
}
