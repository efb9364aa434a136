//! Cursor-based navigation over the sorted key sequence of a table.

use super::node::NodeType;
use super::table::Table;
use crate::errors::Error;

/// A position within a table: a page, a cell inside that page, and a flag
/// for the position one past the last row.
///
/// Cursors borrow the table for their entire lifetime and are discarded
/// after the operation that created them; a mutation invalidates any other
/// outstanding position.
pub struct Cursor<'a> {
    pub table: &'a mut Table,
    pub page_num: u32,
    pub cell_num: u32,
    pub end_of_table: bool,
}

impl<'a> Cursor<'a> {
    /// Positions a cursor at `key`, or at the cell where `key` would be
    /// inserted.
    ///
    /// Descends from the root through internal nodes by binary search until
    /// a leaf is reached. `end_of_table` is left unset; only
    /// [`Cursor::start`] decides whether the table has rows at all.
    pub fn find(table: &'a mut Table, key: u32) -> Result<Self, Error> {
        enum Step {
            Found(u32),
            Descend(u32),
        }

        let mut page_num = table.root_page_num;
        loop {
            table.pager.load(page_num)?;
            let step = {
                let node = table.pager.get(page_num)?;
                match node.node_type()? {
                    NodeType::Leaf => Step::Found(node.leaf_node_find_cell(key)?),
                    NodeType::Internal => {
                        let child_index = node.internal_node_find_child(key)?;
                        Step::Descend(node.internal_node_child(child_index)?)
                    }
                }
            };
            match step {
                Step::Found(cell_num) => {
                    return Ok(Cursor {
                        table,
                        page_num,
                        cell_num,
                        end_of_table: false,
                    })
                }
                Step::Descend(child) => page_num = child,
            }
        }
    }

    /// Positions a cursor at the start of the table (the leftmost leaf's
    /// first cell), flagging `end_of_table` when the table is empty.
    pub fn start(table: &'a mut Table) -> Result<Self, Error> {
        // Key 0 is <= every stored key, so this lands on the leftmost leaf.
        let mut cursor = Cursor::find(table, 0)?;
        let num_cells = {
            let node = cursor.table.pager.get(cursor.page_num)?;
            node.leaf_node_num_cells()?
        };
        cursor.end_of_table = num_cells == 0;
        Ok(cursor)
    }

    /// Copies the value slot of the current cell into `buf`.
    ///
    /// # Errors
    /// Returns an error if the cursor does not point at an occupied leaf
    /// cell.
    pub fn read_value(&mut self, buf: &mut Vec<u8>) -> Result<(), Error> {
        self.table.pager.load(self.page_num)?;
        let node = self.table.pager.get(self.page_num)?;
        let value = node.leaf_node_value(self.cell_num)?;
        buf.clear();
        buf.extend_from_slice(value);
        Ok(())
    }

    /// Moves one cell forward, hopping to the next leaf through the sibling
    /// pointer when the current leaf is exhausted.
    pub fn advance(&mut self) -> Result<(), Error> {
        self.table.pager.load(self.page_num)?;
        let (num_cells, next_leaf) = {
            let node = self.table.pager.get(self.page_num)?;
            (node.leaf_node_num_cells()?, node.leaf_node_next_leaf()?)
        };

        self.cell_num += 1;
        if self.cell_num >= num_cells {
            if next_leaf == 0 {
                // This was the rightmost leaf.
                self.end_of_table = true;
            } else {
                self.page_num = next_leaf;
                self.cell_num = 0;
            }
        }
        Ok(())
    }
}
