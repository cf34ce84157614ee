use super::*;
use smallvec::SmallVec;

#[derive(Clone)]
struct StackEntry<'a, T: Item, D> {
    tree: &'a SumTree<T>,
    index: usize,
    /// Position of the start of the child at `index`.
    position: D,
}

impl<T: Item + fmt::Debug, D: fmt::Debug> fmt::Debug for StackEntry<'_, T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackEntry")
            .field("index", &self.index)
            .field("position", &self.position)
            .finish()
    }
}

/// A position within a [`SumTree`], tracked in the dimension `D`.
///
/// A fresh cursor sits before the first item. Seeking or advancing moves it onto an item,
/// and moving past the last item leaves it at the end, where [`Cursor::item`] is `None`
/// and [`Cursor::start`] is the extent of the whole tree.
#[derive(Clone)]
pub struct Cursor<'a, T: Item, D> {
    tree: &'a SumTree<T>,
    stack: SmallVec<[StackEntry<'a, T, D>; 16]>,
    position: D,
    at_end: bool,
}

impl<T: Item + fmt::Debug, D: fmt::Debug> fmt::Debug for Cursor<'_, T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("stack", &self.stack)
            .field("position", &self.position)
            .field("at_end", &self.at_end)
            .finish()
    }
}

pub struct Iter<'a, T: Item> {
    cursor: Cursor<'a, T, ()>,
}

impl<'a, T, D> Cursor<'a, T, D>
where
    T: Item,
    D: Dimension<T::Summary>,
{
    pub fn new(tree: &'a SumTree<T>) -> Self {
        Self {
            tree,
            stack: SmallVec::new(),
            position: D::zero(),
            at_end: tree.is_empty(),
        }
    }

    fn reset(&mut self) {
        self.at_end = self.tree.is_empty();
        self.stack.clear();
        self.position = D::zero();
    }

    pub fn start(&self) -> &D {
        &self.position
    }

    pub fn end(&self) -> D {
        if let Some(item_summary) = self.item_summary() {
            let mut end = self.start().clone();
            end.add_summary(item_summary);
            end
        } else {
            self.start().clone()
        }
    }

    pub fn item(&self) -> Option<&'a T> {
        let entry = self.stack.last()?;
        let tree = entry.tree;
        match tree.0.as_ref() {
            Node::Leaf { items, .. } => items.get(entry.index),
            Node::Internal { .. } => None,
        }
    }

    pub fn item_summary(&self) -> Option<&'a T::Summary> {
        let entry = self.stack.last()?;
        let tree = entry.tree;
        match tree.0.as_ref() {
            Node::Leaf { item_summaries, .. } => item_summaries.get(entry.index),
            Node::Internal { .. } => None,
        }
    }

    pub fn prev_item(&self) -> Option<&'a T> {
        if self.at_end {
            return self.tree.last();
        }

        for entry in self.stack.iter().rev() {
            if entry.index > 0 {
                let tree = entry.tree;
                return match tree.0.as_ref() {
                    Node::Leaf { items, .. } => items.get(entry.index - 1),
                    Node::Internal { child_trees, .. } => child_trees[entry.index - 1].last(),
                };
            }
        }
        None
    }

    pub fn next_item(&self) -> Option<&'a T> {
        if self.at_end {
            return None;
        }
        if self.stack.is_empty() {
            return self.tree.first();
        }

        for entry in self.stack.iter().rev() {
            let tree = entry.tree;
            match tree.0.as_ref() {
                Node::Leaf { items, .. } => {
                    if entry.index + 1 < items.len() {
                        return items.get(entry.index + 1);
                    }
                }
                Node::Internal { child_trees, .. } => {
                    if entry.index + 1 < child_trees.len() {
                        return child_trees[entry.index + 1].first();
                    }
                }
            }
        }
        None
    }

    /// Advances to the next item. A cursor that sits before the first item moves onto it.
    pub fn next(&mut self) {
        if self.at_end {
            return;
        }

        if self.stack.is_empty() {
            self.descend_to_first_item(self.tree, D::zero());
            return;
        }

        while let Some(entry) = self.stack.last_mut() {
            let tree = entry.tree;
            let summaries = tree.0.child_summaries();
            entry.position.add_summary(&summaries[entry.index]);
            entry.index += 1;

            if entry.index < summaries.len() {
                let index = entry.index;
                let position = entry.position.clone();
                if let Node::Internal { child_trees, .. } = tree.0.as_ref() {
                    self.descend_to_first_item(&child_trees[index], position);
                } else {
                    self.position = position;
                }
                return;
            }

            self.stack.pop();
        }

        self.at_end = true;
        self.position = self.tree.extent();
    }

    /// Moves to the previous item. Moving back from the first item leaves the cursor
    /// before the start of the tree.
    pub fn prev(&mut self) {
        if self.at_end {
            self.reset();
            if !self.tree.is_empty() {
                self.descend_to_last_item(self.tree, D::zero());
            }
            return;
        }

        while let Some(depth) = self.stack.len().checked_sub(1) {
            let index = self.stack[depth].index;
            if index > 0 {
                let tree = self.stack[depth].tree;
                let mut position = if depth > 0 {
                    self.stack[depth - 1].position.clone()
                } else {
                    D::zero()
                };
                for summary in &tree.0.child_summaries()[..index - 1] {
                    position.add_summary(summary);
                }

                let entry = &mut self.stack[depth];
                entry.index = index - 1;
                entry.position = position.clone();
                if let Node::Internal { child_trees, .. } = tree.0.as_ref() {
                    self.descend_to_last_item(&child_trees[index - 1], position);
                } else {
                    self.position = position;
                }
                return;
            }

            self.stack.pop();
        }

        self.position = D::zero();
    }

    fn descend_to_first_item(&mut self, mut tree: &'a SumTree<T>, position: D) {
        loop {
            self.stack.push(StackEntry {
                tree,
                index: 0,
                position: position.clone(),
            });
            match tree.0.as_ref() {
                Node::Internal { child_trees, .. } => tree = &child_trees[0],
                Node::Leaf { .. } => break,
            }
        }
        self.position = position;
    }

    fn descend_to_last_item(&mut self, mut tree: &'a SumTree<T>, mut position: D) {
        loop {
            let summaries = tree.0.child_summaries();
            let last_index = summaries.len() - 1;
            for summary in &summaries[..last_index] {
                position.add_summary(summary);
            }
            self.stack.push(StackEntry {
                tree,
                index: last_index,
                position: position.clone(),
            });
            match tree.0.as_ref() {
                Node::Internal { child_trees, .. } => tree = &child_trees[last_index],
                Node::Leaf { .. } => break,
            }
        }
        self.position = position;
    }

    /// Positions the cursor on the first item whose end is past `target`.
    ///
    /// With [`Bias::Left`], an item that ends exactly at `target` is selected. With
    /// [`Bias::Right`], the cursor moves on to the item that starts at `target`. When no
    /// such item exists, the cursor ends up at the end of the tree.
    pub fn seek<Target>(&mut self, target: &Target, bias: Bias)
    where
        Target: SeekTarget<T::Summary, D> + ?Sized,
    {
        self.reset();
        self.at_end = false;

        let mut position = D::zero();
        let mut tree = self.tree;
        loop {
            let summaries = tree.0.child_summaries();
            let mut selected = None;
            for (index, summary) in summaries.iter().enumerate() {
                let mut child_end = position.clone();
                child_end.add_summary(summary);

                let comparison = target.cmp(&child_end);
                if comparison == Ordering::Greater
                    || (comparison == Ordering::Equal && bias == Bias::Right)
                {
                    position = child_end;
                } else {
                    selected = Some(index);
                    break;
                }
            }

            let Some(index) = selected else {
                break;
            };
            self.stack.push(StackEntry {
                tree,
                index,
                position: position.clone(),
            });
            match tree.0.as_ref() {
                Node::Internal { child_trees, .. } => tree = &child_trees[index],
                Node::Leaf { .. } => {
                    self.position = position;
                    return;
                }
            }
        }

        self.stack.clear();
        self.at_end = true;
        self.position = self.tree.extent();
    }

    /// Returns a tree containing every item before the cursor's current item.
    pub fn prefix(&self) -> SumTree<T> {
        if self.at_end {
            return self.tree.clone();
        }

        let mut prefix = SumTree::new();
        for entry in &self.stack {
            let tree = entry.tree;
            match tree.0.as_ref() {
                Node::Internal { child_trees, .. } => {
                    for child_tree in &child_trees[..entry.index] {
                        prefix.append(child_tree.clone());
                    }
                }
                Node::Leaf { items, .. } => {
                    prefix.extend(items[..entry.index].iter().cloned());
                }
            }
        }
        prefix
    }

    /// Returns a tree containing the cursor's current item and every item after it.
    pub fn suffix(&self) -> SumTree<T> {
        if self.at_end {
            return SumTree::new();
        }
        if self.stack.is_empty() {
            return self.tree.clone();
        }

        let mut suffix = SumTree::new();
        for entry in self.stack.iter().rev() {
            let tree = entry.tree;
            match tree.0.as_ref() {
                Node::Internal { child_trees, .. } => {
                    for child_tree in &child_trees[entry.index + 1..] {
                        suffix.append(child_tree.clone());
                    }
                }
                Node::Leaf { items, .. } => {
                    suffix.extend(items[entry.index..].iter().cloned());
                }
            }
        }
        suffix
    }
}

impl<'a, T, D> Iterator for Cursor<'a, T, D>
where
    T: Item,
    D: Dimension<T::Summary>,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stack.is_empty() {
            self.next();
        }

        let item = self.item()?;
        self.next();
        Some(item)
    }
}

impl<'a, T: Item> Iter<'a, T> {
    pub(crate) fn new(tree: &'a SumTree<T>) -> Self {
        Self {
            cursor: tree.cursor(),
        }
    }
}

impl<'a, T: Item> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next();
        self.cursor.item()
    }
}
