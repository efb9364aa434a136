//! B+ tree node layout.
//!
//! Every page of the database file is one tree node. Nodes with children are
//! "internal" nodes, nodes holding rows are "leaf" nodes:
//!
//! | **Property**       | **Internal Node**             | **Leaf Node**       |
//! |--------------------|-------------------------------|---------------------|
//! | Stores             | keys and pointers to children | keys and values     |
//! | Number of keys     | up to `INTERNAL_NODE_MAX_CELLS` | as many as will fit |
//! | Number of pointers | number of keys + 1            | none                |
//! | Stores values?     | no                            | yes                 |
//!
//! A node is a raw `[u8; PAGE_SIZE]` buffer; this module is the only place
//! that knows the byte offsets. Both node kinds share a common header (type,
//! root flag, parent pointer). A leaf adds a cell count and a pointer to the
//! next leaf, then packs `key + row` cells. An internal node adds a key count
//! and a rightmost child pointer, then packs `child + key` cells; the key at
//! index i is the maximum key stored under `child[i]`.

use super::pager::PAGE_SIZE;
use super::row::ROW_SIZE;
use crate::errors::Error;

/// Represents the type of a B-tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// A leaf node containing key-value cells.
    Leaf,
    /// An internal node containing keys and child pointers.
    Internal,
}

/// Marks the right child of a freshly initialized (empty) internal node.
///
/// Page 0 is always the root, so 0 cannot be used as the "no child" marker
/// the way it is for `next_leaf`.
pub const INVALID_PAGE_NUM: u32 = u32::MAX;

// Common Node Header Layout

const NODE_TYPE_SIZE: usize = std::mem::size_of::<u8>();
const NODE_TYPE_OFFSET: usize = 0;
const IS_ROOT_SIZE: usize = std::mem::size_of::<u8>();
const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
const PARENT_POINTER_SIZE: usize = std::mem::size_of::<u32>();
const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + IS_ROOT_SIZE;
pub const COMMON_NODE_HEADER_SIZE: usize = NODE_TYPE_SIZE + IS_ROOT_SIZE + PARENT_POINTER_SIZE;

// Leaf Node Header Layout

const LEAF_NODE_NUM_CELLS_SIZE: usize = std::mem::size_of::<u32>();
const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const LEAF_NODE_NEXT_LEAF_SIZE: usize = std::mem::size_of::<u32>();
const LEAF_NODE_NEXT_LEAF_OFFSET: usize = LEAF_NODE_NUM_CELLS_OFFSET + LEAF_NODE_NUM_CELLS_SIZE;
pub const LEAF_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE + LEAF_NODE_NEXT_LEAF_SIZE;

// Leaf Node Body Layout

const LEAF_NODE_KEY_SIZE: usize = std::mem::size_of::<u32>();
const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;

/// Cells assigned to the right sibling when splitting a full leaf.
pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) / 2;
/// Cells kept by the left sibling when splitting a full leaf.
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize =
    (LEAF_NODE_MAX_CELLS + 1) - LEAF_NODE_RIGHT_SPLIT_COUNT;

// Internal Node Header Layout

const INTERNAL_NODE_NUM_KEYS_SIZE: usize = std::mem::size_of::<u32>();
const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = std::mem::size_of::<u32>();
const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;

// Internal Node Body Layout

const INTERNAL_NODE_CHILD_SIZE: usize = std::mem::size_of::<u32>();
const INTERNAL_NODE_KEY_SIZE: usize = std::mem::size_of::<u32>();
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;

/// Keys per internal node, kept artificially small to exercise splits.
pub const INTERNAL_NODE_MAX_CELLS: usize = 3;

/// One page of the database, interpreted through the accessors below.
#[derive(Debug, Clone)]
pub struct Node {
    pub data: [u8; PAGE_SIZE],
}

impl Node {
    /// A zeroed page. Reads as a leaf with no cells; callers initialize it
    /// as a proper leaf or internal node before storing data.
    pub fn zeroed() -> Self {
        Node {
            data: [0u8; PAGE_SIZE],
        }
    }

    pub fn from_bytes(buf: &[u8; PAGE_SIZE]) -> Self {
        let mut data = [0u8; PAGE_SIZE];
        data.copy_from_slice(buf);
        Node { data }
    }

    fn read_u32(&self, offset: usize) -> Result<u32, Error> {
        let bytes = &self.data[offset..offset + 4];
        Ok(u32::from_le_bytes(bytes.try_into().map_err(|e| {
            err!(Storage, "Failed to decode u32 at offset {}: {:?}", offset, e)
        })?))
    }

    fn write_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    // Common header

    pub fn node_type(&self) -> Result<NodeType, Error> {
        match self.data[NODE_TYPE_OFFSET] {
            0 => Ok(NodeType::Leaf),
            1 => Ok(NodeType::Internal),
            invalid => Err(err!(Storage, "Invalid node type value: {}", invalid)),
        }
    }

    pub fn set_node_type(&mut self, node_type: NodeType) {
        self.data[NODE_TYPE_OFFSET] = match node_type {
            NodeType::Leaf => 0,
            NodeType::Internal => 1,
        };
    }

    pub fn is_node_root(&self) -> bool {
        self.data[IS_ROOT_OFFSET] == 1
    }

    pub fn set_node_root(&mut self, is_root: bool) {
        self.data[IS_ROOT_OFFSET] = is_root as u8;
    }

    pub fn node_parent(&self) -> Result<u32, Error> {
        self.read_u32(PARENT_POINTER_OFFSET)
    }

    pub fn set_node_parent(&mut self, parent: u32) {
        self.write_u32(PARENT_POINTER_OFFSET, parent);
    }

    // Leaf accessors

    pub fn leaf_node_num_cells(&self) -> Result<u32, Error> {
        self.read_u32(LEAF_NODE_NUM_CELLS_OFFSET)
    }

    pub fn set_leaf_node_num_cells(&mut self, num: u32) {
        self.write_u32(LEAF_NODE_NUM_CELLS_OFFSET, num);
    }

    /// Page number of the leaf to the right, 0 meaning no sibling.
    pub fn leaf_node_next_leaf(&self) -> Result<u32, Error> {
        self.read_u32(LEAF_NODE_NEXT_LEAF_OFFSET)
    }

    pub fn set_leaf_node_next_leaf(&mut self, next: u32) {
        self.write_u32(LEAF_NODE_NEXT_LEAF_OFFSET, next);
    }

    fn leaf_node_cell_offset(&self, cell_num: u32) -> Result<usize, Error> {
        if cell_num as usize >= LEAF_NODE_MAX_CELLS {
            return Err(err!(
                Storage,
                "Leaf cell number out of bounds (cell_num={}, max_cells={})",
                cell_num,
                LEAF_NODE_MAX_CELLS
            ));
        }
        Ok(LEAF_NODE_HEADER_SIZE + cell_num as usize * LEAF_NODE_CELL_SIZE)
    }

    pub fn leaf_node_cell(&self, cell_num: u32) -> Result<&[u8], Error> {
        let offset = self.leaf_node_cell_offset(cell_num)?;
        Ok(&self.data[offset..offset + LEAF_NODE_CELL_SIZE])
    }

    pub fn leaf_node_cell_mut(&mut self, cell_num: u32) -> Result<&mut [u8], Error> {
        let offset = self.leaf_node_cell_offset(cell_num)?;
        Ok(&mut self.data[offset..offset + LEAF_NODE_CELL_SIZE])
    }

    pub fn leaf_node_key(&self, cell_num: u32) -> Result<u32, Error> {
        let offset = self.leaf_node_cell_offset(cell_num)?;
        self.read_u32(offset)
    }

    pub fn set_leaf_node_key(&mut self, cell_num: u32, key: u32) -> Result<(), Error> {
        let offset = self.leaf_node_cell_offset(cell_num)?;
        self.write_u32(offset, key);
        Ok(())
    }

    pub fn leaf_node_value(&self, cell_num: u32) -> Result<&[u8], Error> {
        let offset = self.leaf_node_cell_offset(cell_num)? + LEAF_NODE_KEY_SIZE;
        Ok(&self.data[offset..offset + LEAF_NODE_VALUE_SIZE])
    }

    pub fn leaf_node_value_mut(&mut self, cell_num: u32) -> Result<&mut [u8], Error> {
        let offset = self.leaf_node_cell_offset(cell_num)? + LEAF_NODE_KEY_SIZE;
        Ok(&mut self.data[offset..offset + LEAF_NODE_VALUE_SIZE])
    }

    /// Binary search for the first cell whose key is >= `key`.
    ///
    /// Returns the cell index where `key` lives or should be inserted, which
    /// may be one past the last occupied cell.
    pub fn leaf_node_find_cell(&self, key: u32) -> Result<u32, Error> {
        let mut min_index = 0u32;
        let mut one_past_max_index = self.leaf_node_num_cells()?;
        while one_past_max_index != min_index {
            let index = (min_index + one_past_max_index) / 2;
            let key_at_index = self.leaf_node_key(index)?;
            if key == key_at_index {
                return Ok(index);
            }
            if key < key_at_index {
                one_past_max_index = index;
            } else {
                min_index = index + 1;
            }
        }
        Ok(min_index)
    }

    // Internal accessors

    pub fn internal_node_num_keys(&self) -> Result<u32, Error> {
        self.read_u32(INTERNAL_NODE_NUM_KEYS_OFFSET)
    }

    pub fn set_internal_node_num_keys(&mut self, num_keys: u32) {
        self.write_u32(INTERNAL_NODE_NUM_KEYS_OFFSET, num_keys);
    }

    pub fn internal_node_right_child(&self) -> Result<u32, Error> {
        self.read_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET)
    }

    pub fn set_internal_node_right_child(&mut self, right_child: u32) {
        self.write_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET, right_child);
    }

    fn internal_node_cell_offset(&self, cell_num: u32) -> Result<usize, Error> {
        let offset = INTERNAL_NODE_HEADER_SIZE + cell_num as usize * INTERNAL_NODE_CELL_SIZE;
        if offset + INTERNAL_NODE_CELL_SIZE > self.data.len() {
            return Err(err!(
                Storage,
                "Internal cell offset exceeds page size (cell_num={})",
                cell_num
            ));
        }
        Ok(offset)
    }

    pub fn internal_node_cell(&self, cell_num: u32) -> Result<&[u8], Error> {
        let offset = self.internal_node_cell_offset(cell_num)?;
        Ok(&self.data[offset..offset + INTERNAL_NODE_CELL_SIZE])
    }

    pub fn internal_node_cell_mut(&mut self, cell_num: u32) -> Result<&mut [u8], Error> {
        let offset = self.internal_node_cell_offset(cell_num)?;
        Ok(&mut self.data[offset..offset + INTERNAL_NODE_CELL_SIZE])
    }

    /// Child page at `child_num`, where `child_num == num_keys` addresses the
    /// rightmost child.
    ///
    /// # Errors
    /// `child_num > num_keys` is a structural error, as is reading a right
    /// child that is still [`INVALID_PAGE_NUM`].
    pub fn internal_node_child(&self, child_num: u32) -> Result<u32, Error> {
        let num_keys = self.internal_node_num_keys()?;
        if child_num > num_keys {
            return Err(err!(
                Storage,
                "Child index {} exceeds num_keys {}",
                child_num,
                num_keys
            ));
        }
        if child_num == num_keys {
            let right_child = self.internal_node_right_child()?;
            if right_child == INVALID_PAGE_NUM {
                return Err(err!(Storage, "Tried to access right child of empty node"));
            }
            Ok(right_child)
        } else {
            let child = self.read_u32(self.internal_node_cell_offset(child_num)?)?;
            if child == INVALID_PAGE_NUM {
                return Err(err!(Storage, "Tried to access child {} of empty node", child_num));
            }
            Ok(child)
        }
    }

    pub fn set_internal_node_child(&mut self, cell_num: u32, child: u32) -> Result<(), Error> {
        let offset = self.internal_node_cell_offset(cell_num)?;
        self.write_u32(offset, child);
        Ok(())
    }

    pub fn internal_node_key(&self, key_num: u32) -> Result<u32, Error> {
        let num_keys = self.internal_node_num_keys()?;
        if key_num >= num_keys {
            return Err(err!(
                Storage,
                "Key index {} exceeds num_keys {}",
                key_num,
                num_keys
            ));
        }
        let offset = self.internal_node_cell_offset(key_num)? + INTERNAL_NODE_CHILD_SIZE;
        self.read_u32(offset)
    }

    pub fn set_internal_node_key(&mut self, key_num: u32, key: u32) -> Result<(), Error> {
        let num_keys = self.internal_node_num_keys()?;
        if key_num >= num_keys {
            return Err(err!(
                Storage,
                "Key index {} exceeds num_keys {}",
                key_num,
                num_keys
            ));
        }
        let offset = self.internal_node_cell_offset(key_num)? + INTERNAL_NODE_CHILD_SIZE;
        self.write_u32(offset, key);
        Ok(())
    }

    /// Binary search for the index of the child that should contain `key`:
    /// the smallest index whose key is >= `key`, possibly `num_keys` for the
    /// rightmost child.
    pub fn internal_node_find_child(&self, key: u32) -> Result<u32, Error> {
        let num_keys = self.internal_node_num_keys()?;
        let mut min_index = 0u32;
        let mut max_index = num_keys;
        while min_index != max_index {
            let index = (min_index + max_index) / 2;
            let key_to_right = self.internal_node_key(index)?;
            if key_to_right >= key {
                max_index = index;
            } else {
                min_index = index + 1;
            }
        }
        Ok(min_index)
    }

    /// Rewrites the separator key that used to be `old_key` after a child's
    /// maximum changed.
    ///
    /// When `old_key` routes to the rightmost child there is no key slot to
    /// fix, so the call is a no-op.
    pub fn update_internal_node_key(&mut self, old_key: u32, new_key: u32) -> Result<(), Error> {
        let old_child_index = self.internal_node_find_child(old_key)?;
        if old_child_index < self.internal_node_num_keys()? {
            self.set_internal_node_key(old_child_index, new_key)?;
        }
        Ok(())
    }
}

pub fn initialize_leaf_node(node: &mut Node) {
    node.set_node_type(NodeType::Leaf);
    node.set_node_root(false);
    node.set_leaf_node_num_cells(0);
    node.set_leaf_node_next_leaf(0); // 0 represents no sibling
}

pub fn initialize_internal_node(node: &mut Node) {
    node.set_node_type(NodeType::Internal);
    node.set_node_root(false);
    node.set_internal_node_num_keys(0);
    node.set_internal_node_right_child(INVALID_PAGE_NUM);
}

/// Renders the layout constants for the `.constants` meta-command.
pub fn format_constants() -> String {
    let mut out = String::new();
    out.push_str("Constants:\n");
    out.push_str(&format!("ROW_SIZE: {}\n", ROW_SIZE));
    out.push_str(&format!(
        "COMMON_NODE_HEADER_SIZE: {}\n",
        COMMON_NODE_HEADER_SIZE
    ));
    out.push_str(&format!("LEAF_NODE_HEADER_SIZE: {}\n", LEAF_NODE_HEADER_SIZE));
    out.push_str(&format!("LEAF_NODE_CELL_SIZE: {}\n", LEAF_NODE_CELL_SIZE));
    out.push_str(&format!(
        "LEAF_NODE_SPACE_FOR_CELLS: {}\n",
        LEAF_NODE_SPACE_FOR_CELLS
    ));
    out.push_str(&format!("LEAF_NODE_MAX_CELLS: {}\n", LEAF_NODE_MAX_CELLS));
    out
}
