//! The table: a B+ tree of rows keyed by id, rooted at page 0.
//!
//! Searching is logarithmic, insertion into a found leaf is constant-ish,
//! and range traversal walks the leaf sibling chain. The price is that full
//! nodes split: a leaf split may push a new child into its parent, a full
//! parent splits in turn, and a full root is rebuilt in place so that the
//! root never moves off page 0.

use super::cursor::Cursor;
use super::node::{
    initialize_internal_node, initialize_leaf_node, NodeType, INTERNAL_NODE_MAX_CELLS,
    INVALID_PAGE_NUM, LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_RIGHT_SPLIT_COUNT,
};
use super::pager::Pager;
use super::row::Row;
use crate::errors::Error;
use std::path::Path;
use tracing::debug;

pub struct Table {
    pub root_page_num: u32,
    pub pager: Pager,
}

impl Table {
    /// Opens a database file, bootstrapping an empty leaf root for a fresh
    /// file.
    pub fn open(path: &Path) -> Result<Table, Error> {
        let mut pager = Pager::open(path)?;

        if pager.num_pages() == 0 {
            // New database file. Initialize page 0 as leaf node.
            pager.load(0)?;
            let mut root = pager.get(0)?;
            initialize_leaf_node(&mut root);
            root.set_node_root(true);
        }

        Ok(Table {
            root_page_num: 0,
            pager,
        })
    }

    /// Flushes every resident page and closes the file.
    pub fn close(&mut self) -> Result<(), Error> {
        self.pager.close()
    }
}

/// Inserts a row at its sorted position.
///
/// # Errors
/// Returns `Error::DuplicateKey` if a row with the same id already exists;
/// the tree is left untouched.
pub fn insert_row(table: &mut Table, row: &Row) -> Result<(), Error> {
    let key = row.id;
    debug!(row_id = key, "Inserting a row...");

    let cursor = Cursor::find(table, key)?;
    let (page_num, cell_num) = (cursor.page_num, cursor.cell_num);
    let table = cursor.table;

    let num_cells = {
        let node = table.pager.get(page_num)?;
        let num_cells = node.leaf_node_num_cells()?;
        if cell_num < num_cells && node.leaf_node_key(cell_num)? == key {
            return Err(Error::DuplicateKey);
        }
        num_cells
    };

    if num_cells as usize >= LEAF_NODE_MAX_CELLS {
        debug!(page_num, num_cells, "Leaf node full. Splitting...");
        return leaf_node_split_and_insert(table, page_num, cell_num, key, row);
    }

    let mut node = table.pager.get(page_num)?;
    if cell_num < num_cells {
        // Make room for the new cell.
        let src = (*node).clone();
        for i in ((cell_num + 1)..=num_cells).rev() {
            node.leaf_node_cell_mut(i)?
                .copy_from_slice(src.leaf_node_cell(i - 1)?);
        }
    }
    node.set_leaf_node_num_cells(num_cells + 1);
    node.set_leaf_node_key(cell_num, key)?;
    row.serialize_into(node.leaf_node_value_mut(cell_num)?)?;
    Ok(())
}

/// Splits a full leaf around an insertion point.
///
/// A new leaf is allocated, the existing cells plus the new one are divided
/// evenly between the two siblings, and the new leaf is handed to the
/// parent. Splitting the root instead rebuilds the root in place.
fn leaf_node_split_and_insert(
    table: &mut Table,
    page_num: u32,
    cell_num: u32,
    key: u32,
    row: &Row,
) -> Result<(), Error> {
    let new_page_num = table.pager.unused_page_num();
    table.pager.load(new_page_num)?;
    debug!(page_num, new_page_num, "Splitting leaf node...");

    let (splitting_root, parent_page_num, old_max, new_max) = {
        let mut old_node = table.pager.get(page_num)?;
        let mut new_node = table.pager.get(new_page_num)?;
        let old_max = old_node.leaf_node_key(old_node.leaf_node_num_cells()? - 1)?;

        initialize_leaf_node(&mut new_node);
        new_node.set_node_parent(old_node.node_parent()?);

        // The old leaf's sibling becomes the new leaf, and the new leaf's
        // sibling becomes whatever used to be the old leaf's sibling.
        new_node.set_leaf_node_next_leaf(old_node.leaf_node_next_leaf()?);
        old_node.set_leaf_node_next_leaf(new_page_num);

        // All existing keys plus the new key are divided evenly between the
        // old (left) and new (right) nodes. Starting from the right, move
        // each key to its final position.
        let src = (*old_node).clone();
        for i in (0..=LEAF_NODE_MAX_CELLS as u32).rev() {
            let dest_node = if i as usize >= LEAF_NODE_LEFT_SPLIT_COUNT {
                &mut new_node
            } else {
                &mut old_node
            };
            let index_within_node = i % LEAF_NODE_LEFT_SPLIT_COUNT as u32;

            if i == cell_num {
                dest_node.set_leaf_node_key(index_within_node, key)?;
                row.serialize_into(dest_node.leaf_node_value_mut(index_within_node)?)?;
            } else if i > cell_num {
                dest_node
                    .leaf_node_cell_mut(index_within_node)?
                    .copy_from_slice(src.leaf_node_cell(i - 1)?);
            } else {
                dest_node
                    .leaf_node_cell_mut(index_within_node)?
                    .copy_from_slice(src.leaf_node_cell(i)?);
            }
        }

        old_node.set_leaf_node_num_cells(LEAF_NODE_LEFT_SPLIT_COUNT as u32);
        new_node.set_leaf_node_num_cells(LEAF_NODE_RIGHT_SPLIT_COUNT as u32);

        let new_max = old_node.leaf_node_key(LEAF_NODE_LEFT_SPLIT_COUNT as u32 - 1)?;
        (
            old_node.is_node_root(),
            old_node.node_parent()?,
            old_max,
            new_max,
        )
    };

    if splitting_root {
        return create_new_root(table, new_page_num);
    }

    {
        table.pager.load(parent_page_num)?;
        let mut parent = table.pager.get(parent_page_num)?;
        parent.update_internal_node_key(old_max, new_max)?;
    }
    internal_node_insert(table, parent_page_num, new_page_num)
}

/// Rebuilds the root after a split of the root node.
///
/// The old root's contents move to a freshly allocated left child so the
/// root itself can stay at page 0; the caller supplies the right child. The
/// root then becomes an internal node with exactly one key.
fn create_new_root(table: &mut Table, right_child_page_num: u32) -> Result<(), Error> {
    debug!(right_child_page_num, "Creating a new root");

    let root_page_num = table.root_page_num;
    table.pager.load(right_child_page_num)?;
    let left_child_page_num = table.pager.unused_page_num();
    table.pager.load(left_child_page_num)?;

    let root_is_internal =
        { table.pager.get(root_page_num)?.node_type()? == NodeType::Internal };
    if root_is_internal {
        // An internal root splits into two internal children; the new right
        // child starts out empty.
        let mut right_child = table.pager.get(right_child_page_num)?;
        initialize_internal_node(&mut right_child);
    }

    // The old root is copied to the left child so we can reuse the root page.
    let children = {
        let root = table.pager.get(root_page_num)?;
        let mut left_child = table.pager.get(left_child_page_num)?;
        left_child.data.copy_from_slice(&root.data);
        left_child.set_node_root(false);

        let mut children = Vec::new();
        if left_child.node_type()? == NodeType::Internal {
            for i in 0..=left_child.internal_node_num_keys()? {
                children.push(left_child.internal_node_child(i)?);
            }
        }
        children
    };
    // The copied node's children still point at the root page; fix them up
    // before the root is reinitialized.
    for child_page in children {
        table.pager.load(child_page)?;
        table.pager.get(child_page)?.set_node_parent(left_child_page_num);
    }

    // Finally the root page becomes a new internal node with two children.
    let left_child_max_key = table.pager.node_max_key(left_child_page_num)?;
    {
        let mut root = table.pager.get(root_page_num)?;
        initialize_internal_node(&mut root);
        root.set_node_root(true);
        root.set_internal_node_num_keys(1);
        root.set_internal_node_child(0, left_child_page_num)?;
        root.set_internal_node_key(0, left_child_max_key)?;
        root.set_internal_node_right_child(right_child_page_num);
    }
    table.pager.get(left_child_page_num)?.set_node_parent(root_page_num);
    table
        .pager
        .get(right_child_page_num)?
        .set_node_parent(root_page_num);
    Ok(())
}

/// Adds a child/key pair to an internal node.
///
/// The rightmost child pointer is stored separately from the cell array, so
/// a child whose max key exceeds the current right child's max takes the
/// right child slot and the displaced right child moves into the cells.
fn internal_node_insert(
    table: &mut Table,
    parent_page_num: u32,
    child_page_num: u32,
) -> Result<(), Error> {
    debug!(parent_page_num, child_page_num, "Inserting child into internal node");

    table.pager.load(parent_page_num)?;
    table.pager.load(child_page_num)?;
    let child_max_key = table.pager.node_max_key(child_page_num)?;

    let (index, original_num_keys, right_child_page_num) = {
        let parent = table.pager.get(parent_page_num)?;
        (
            parent.internal_node_find_child(child_max_key)?,
            parent.internal_node_num_keys()?,
            parent.internal_node_right_child()?,
        )
    };

    if original_num_keys as usize >= INTERNAL_NODE_MAX_CELLS {
        return internal_node_split_and_insert(table, parent_page_num, child_page_num);
    }

    // An internal node with a right child of INVALID_PAGE_NUM is empty.
    if right_child_page_num == INVALID_PAGE_NUM {
        let mut parent = table.pager.get(parent_page_num)?;
        parent.set_internal_node_right_child(child_page_num);
        return Ok(());
    }

    let right_max_key = table.pager.node_max_key(right_child_page_num)?;
    let mut parent = table.pager.get(parent_page_num)?;
    // The placement below fully overwrites the freshly counted slot.
    parent.set_internal_node_num_keys(original_num_keys + 1);

    if child_max_key > right_max_key {
        // Replace the right child.
        parent.set_internal_node_child(original_num_keys, right_child_page_num)?;
        parent.set_internal_node_key(original_num_keys, right_max_key)?;
        parent.set_internal_node_right_child(child_page_num);
    } else {
        // Make room for the new cell.
        let src = (*parent).clone();
        for i in ((index + 1)..=original_num_keys).rev() {
            parent
                .internal_node_cell_mut(i)?
                .copy_from_slice(src.internal_node_cell(i - 1)?);
        }
        parent.set_internal_node_child(index, child_page_num)?;
        parent.set_internal_node_key(index, child_max_key)?;
    }
    Ok(())
}

/// Splits a full internal node while adding one more child to it.
///
/// A sibling takes the upper half of the keys, the middle child is promoted
/// to be the old node's right child, and the sibling is then inserted into
/// the parent, which may split recursively. Splitting the root goes through
/// [`create_new_root`] first so the root stays on page 0.
fn internal_node_split_and_insert(
    table: &mut Table,
    parent_page_num: u32,
    child_page_num: u32,
) -> Result<(), Error> {
    let mut old_page_num = parent_page_num;
    let old_max = table.pager.node_max_key(old_page_num)?;
    let child_max = table.pager.node_max_key(child_page_num)?;
    let new_page_num = table.pager.unused_page_num();
    let splitting_root = { table.pager.get(old_page_num)?.is_node_root() };
    debug!(
        old_page_num,
        child_page_num, new_page_num, splitting_root, "Splitting internal node..."
    );

    let parent_page_num = if splitting_root {
        // The root keeps its page: its contents move into a fresh left
        // child and the new (still empty) sibling becomes the right child.
        create_new_root(table, new_page_num)?;
        let root_page_num = table.root_page_num;
        old_page_num = { table.pager.get(root_page_num)?.internal_node_child(0)? };
        root_page_num
    } else {
        let parent = { table.pager.get(old_page_num)?.node_parent()? };
        table.pager.load(new_page_num)?;
        let mut new_node = table.pager.get(new_page_num)?;
        initialize_internal_node(&mut new_node);
        drop(new_node);
        parent
    };

    // First move the old node's right child over, leaving the old node
    // temporarily without one.
    let old_right_child = { table.pager.get(old_page_num)?.internal_node_right_child()? };
    internal_node_insert(table, new_page_num, old_right_child)?;
    table.pager.get(old_right_child)?.set_node_parent(new_page_num);
    table
        .pager
        .get(old_page_num)?
        .set_internal_node_right_child(INVALID_PAGE_NUM);

    // Move cells above the middle into the new node, one at a time.
    let mut i = INTERNAL_NODE_MAX_CELLS as u32 - 1;
    while i > INTERNAL_NODE_MAX_CELLS as u32 / 2 {
        let cur_page_num = { table.pager.get(old_page_num)?.internal_node_child(i)? };
        internal_node_insert(table, new_page_num, cur_page_num)?;
        table.pager.get(cur_page_num)?.set_node_parent(new_page_num);
        {
            let mut old_node = table.pager.get(old_page_num)?;
            let num_keys = old_node.internal_node_num_keys()?;
            old_node.set_internal_node_num_keys(num_keys - 1);
        }
        i -= 1;
    }

    // The highest remaining child becomes the old node's right child.
    {
        let mut old_node = table.pager.get(old_page_num)?;
        let num_keys = old_node.internal_node_num_keys()?;
        let promoted = old_node.internal_node_child(num_keys - 1)?;
        old_node.set_internal_node_right_child(promoted);
        old_node.set_internal_node_num_keys(num_keys - 1);
    }

    // Insert the pending child on whichever side its keys now belong.
    let max_after_split = table.pager.node_max_key(old_page_num)?;
    let destination_page_num = if child_max < max_after_split {
        old_page_num
    } else {
        new_page_num
    };
    internal_node_insert(table, destination_page_num, child_page_num)?;
    table
        .pager
        .get(child_page_num)?
        .set_node_parent(destination_page_num);

    {
        let old_node_max = table.pager.node_max_key(old_page_num)?;
        table.pager.load(parent_page_num)?;
        let mut parent = table.pager.get(parent_page_num)?;
        parent.update_internal_node_key(old_max, old_node_max)?;
    }
    if !splitting_root {
        internal_node_insert(table, parent_page_num, new_page_num)?;
        table.pager.get(new_page_num)?.set_node_parent(parent_page_num);
    }
    Ok(())
}

/// Reads every row in ascending key order by walking the leaf chain.
pub fn select_rows(table: &mut Table) -> Result<Vec<Row>, Error> {
    let mut rows = Vec::new();
    let mut buf = Vec::new();

    let mut cursor = Cursor::start(table)?;
    while !cursor.end_of_table {
        cursor.read_value(&mut buf)?;
        rows.push(Row::deserialize(&buf)?);
        cursor.advance()?;
    }
    Ok(rows)
}

/// Renders the tree for the `.btree` meta-command, two-space indent per
/// level.
pub fn render_btree(table: &mut Table) -> Result<String, Error> {
    let mut out = String::new();
    render_node(table, table.root_page_num, 0, &mut out)?;
    Ok(out)
}

fn render_node(
    table: &mut Table,
    page_num: u32,
    indentation_level: usize,
    out: &mut String,
) -> Result<(), Error> {
    table.pager.load(page_num)?;

    let mut leaf_keys = Vec::new();
    let mut internal_cells = Vec::new();
    let mut right_child = INVALID_PAGE_NUM;
    let node_type = {
        let node = table.pager.get(page_num)?;
        let node_type = node.node_type()?;
        match node_type {
            NodeType::Leaf => {
                for i in 0..node.leaf_node_num_cells()? {
                    leaf_keys.push(node.leaf_node_key(i)?);
                }
            }
            NodeType::Internal => {
                let num_keys = node.internal_node_num_keys()?;
                for i in 0..num_keys {
                    internal_cells.push((node.internal_node_child(i)?, node.internal_node_key(i)?));
                }
                if num_keys > 0 {
                    right_child = node.internal_node_right_child()?;
                }
            }
        }
        node_type
    };

    match node_type {
        NodeType::Leaf => {
            indent(out, indentation_level);
            out.push_str(&format!("- leaf (size {})\n", leaf_keys.len()));
            for key in leaf_keys {
                indent(out, indentation_level + 1);
                out.push_str(&format!("- {}\n", key));
            }
        }
        NodeType::Internal => {
            indent(out, indentation_level);
            out.push_str(&format!("- internal (size {})\n", internal_cells.len()));
            for (child, key) in internal_cells {
                render_node(table, child, indentation_level + 1, out)?;
                indent(out, indentation_level + 1);
                out.push_str(&format!("- key {}\n", key));
            }
            if right_child != INVALID_PAGE_NUM {
                render_node(table, right_child, indentation_level + 1, out)?;
            }
        }
    }
    Ok(())
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_row(id: u32) -> Row {
        Row::new(id, &format!("user{}", id), &format!("u{}@x", id)).unwrap()
    }

    fn ids(table: &mut Table) -> Vec<u32> {
        select_rows(table).unwrap().iter().map(|r| r.id).collect()
    }

    /// Walks a subtree checking parent pointers, key ordering and separator
    /// keys, returning the subtree max and its keys in order.
    fn check_subtree(table: &mut Table, page_num: u32, parent: Option<u32>) -> (u32, Vec<u32>) {
        table.pager.load(page_num).unwrap();

        let mut leaf_keys = Vec::new();
        let mut internal_cells = Vec::new();
        let mut right_child = None;
        let node_type = {
            let node = table.pager.get(page_num).unwrap();
            match parent {
                Some(p) => {
                    assert!(!node.is_node_root());
                    assert_eq!(node.node_parent().unwrap(), p, "bad parent of page {}", page_num);
                }
                None => assert!(node.is_node_root()),
            }
            let node_type = node.node_type().unwrap();
            match node_type {
                NodeType::Leaf => {
                    for i in 0..node.leaf_node_num_cells().unwrap() {
                        leaf_keys.push(node.leaf_node_key(i).unwrap());
                    }
                }
                NodeType::Internal => {
                    for i in 0..node.internal_node_num_keys().unwrap() {
                        internal_cells.push((
                            node.internal_node_child(i).unwrap(),
                            node.internal_node_key(i).unwrap(),
                        ));
                    }
                    right_child = Some(node.internal_node_right_child().unwrap());
                }
            }
            node_type
        };

        match node_type {
            NodeType::Leaf => {
                assert!(
                    leaf_keys.windows(2).all(|w| w[0] < w[1]),
                    "leaf {} keys not ascending: {:?}",
                    page_num,
                    leaf_keys
                );
                (*leaf_keys.last().unwrap(), leaf_keys)
            }
            NodeType::Internal => {
                let mut all_keys = Vec::new();
                let mut prev_max = None;
                for (child, key) in internal_cells {
                    let (child_max, child_keys) = check_subtree(table, child, Some(page_num));
                    assert_eq!(child_max, key, "separator key mismatch in page {}", page_num);
                    if let Some(prev) = prev_max {
                        assert!(prev < child_max);
                    }
                    prev_max = Some(child_max);
                    all_keys.extend(child_keys);
                }
                let (right_max, right_keys) =
                    check_subtree(table, right_child.unwrap(), Some(page_num));
                if let Some(prev) = prev_max {
                    assert!(prev < right_max);
                }
                all_keys.extend(right_keys);
                (right_max, all_keys)
            }
        }
    }

    fn check_tree(table: &mut Table, expected_keys: &[u32]) {
        let root = table.root_page_num;
        let (_, keys) = check_subtree(table, root, None);
        assert_eq!(keys, expected_keys);
        // The leaf chain drives selects; it must agree with the in-order
        // traversal.
        assert_eq!(ids(table), expected_keys);
    }

    #[test]
    fn test_select_on_fresh_table_is_empty() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(&dir.path().join("test.db")).unwrap();
        assert!(select_rows(&mut table).unwrap().is_empty());
    }

    #[test]
    fn test_insert_and_select() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(&dir.path().join("test.db")).unwrap();
        insert_row(&mut table, &Row::new(1, "alice", "a@x").unwrap()).unwrap();
        insert_row(&mut table, &Row::new(2, "bob", "b@x").unwrap()).unwrap();

        let rows = select_rows(&mut table).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].to_string(), "(1, alice, a@x)");
        assert_eq!(rows[1].to_string(), "(2, bob, b@x)");
    }

    #[test]
    fn test_out_of_order_inserts_come_back_sorted() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(&dir.path().join("test.db")).unwrap();
        for id in [3u32, 1, 2] {
            insert_row(&mut table, &test_row(id)).unwrap();
        }
        assert_eq!(ids(&mut table), vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_key_leaves_tree_unchanged() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(&dir.path().join("test.db")).unwrap();
        insert_row(&mut table, &Row::new(1, "alice", "a@x").unwrap()).unwrap();
        let before_rows = select_rows(&mut table).unwrap();
        let before_tree = render_btree(&mut table).unwrap();

        let result = insert_row(&mut table, &Row::new(1, "alice2", "a2@x").unwrap());
        assert!(matches!(result, Err(Error::DuplicateKey)));

        assert_eq!(select_rows(&mut table).unwrap(), before_rows);
        assert_eq!(render_btree(&mut table).unwrap(), before_tree);
    }

    #[test]
    fn test_full_leaf_without_split() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(&dir.path().join("test.db")).unwrap();
        for id in 1..=LEAF_NODE_MAX_CELLS as u32 {
            insert_row(&mut table, &test_row(id)).unwrap();
        }
        let tree = render_btree(&mut table).unwrap();
        assert!(tree.starts_with(&format!("- leaf (size {})\n", LEAF_NODE_MAX_CELLS)));
    }

    #[test]
    fn test_leaf_split_creates_internal_root() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(&dir.path().join("test.db")).unwrap();
        let expected: Vec<u32> = (1..=20).collect();
        for id in &expected {
            insert_row(&mut table, &test_row(*id)).unwrap();
        }

        let tree = render_btree(&mut table).unwrap();
        assert!(tree.starts_with("- internal (size 1)\n"));
        check_tree(&mut table, &expected);
    }

    #[test]
    fn test_btree_rendering_after_first_split() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(&dir.path().join("test.db")).unwrap();
        for id in 1..=(LEAF_NODE_MAX_CELLS as u32 + 1) {
            insert_row(&mut table, &test_row(id)).unwrap();
        }

        let mut expected = String::from("- internal (size 1)\n");
        expected.push_str("  - leaf (size 7)\n");
        for key in 1..=7 {
            expected.push_str(&format!("    - {}\n", key));
        }
        expected.push_str("  - key 7\n");
        expected.push_str("  - leaf (size 7)\n");
        for key in 8..=14 {
            expected.push_str(&format!("    - {}\n", key));
        }
        assert_eq!(render_btree(&mut table).unwrap(), expected);
    }

    #[test]
    fn test_sequential_inserts_deep_tree() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(&dir.path().join("test.db")).unwrap();
        let expected: Vec<u32> = (1..=100).collect();
        for id in &expected {
            insert_row(&mut table, &test_row(*id)).unwrap();
        }
        check_tree(&mut table, &expected);

        // The root must have split at least once more than the first level.
        let tree = render_btree(&mut table).unwrap();
        assert!(tree.starts_with("- internal"));
        assert!(tree.contains("  - internal"));
    }

    #[test]
    fn test_shuffled_inserts_deep_tree() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(&dir.path().join("test.db")).unwrap();
        // 53 is coprime to 101, so this visits every id in 1..=100 once.
        let keys: Vec<u32> = (1..=100u32).map(|i| (i * 53) % 101).collect();
        for id in &keys {
            insert_row(&mut table, &test_row(*id)).unwrap();
        }
        let expected: Vec<u32> = (1..=100).collect();
        check_tree(&mut table, &expected);
    }

    #[test]
    fn test_descending_inserts() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(&dir.path().join("test.db")).unwrap();
        for id in (1..=60u32).rev() {
            insert_row(&mut table, &test_row(id)).unwrap();
        }
        let expected: Vec<u32> = (1..=60).collect();
        check_tree(&mut table, &expected);
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let (rows_before, tree_before) = {
            let mut table = Table::open(&path).unwrap();
            for id in 1..=20u32 {
                insert_row(&mut table, &test_row(id)).unwrap();
            }
            let rows = select_rows(&mut table).unwrap();
            let tree = render_btree(&mut table).unwrap();
            table.close().unwrap();
            (rows, tree)
        };

        let mut table = Table::open(&path).unwrap();
        assert_eq!(select_rows(&mut table).unwrap(), rows_before);
        assert_eq!(render_btree(&mut table).unwrap(), tree_before);

        // The reloaded tree still accepts inserts on both sides.
        insert_row(&mut table, &test_row(0)).unwrap();
        insert_row(&mut table, &test_row(21)).unwrap();
        let expected: Vec<u32> = (0..=21).collect();
        check_tree(&mut table, &expected);
    }

    #[test]
    fn test_file_length_is_page_aligned_after_close() {
        use crate::storage::pager::PAGE_SIZE;

        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let mut table = Table::open(&path).unwrap();
        for id in 1..=40u32 {
            insert_row(&mut table, &test_row(id)).unwrap();
        }
        table.close().unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        assert!(len > 0);
        assert_eq!(len % PAGE_SIZE as u64, 0);
    }
}
