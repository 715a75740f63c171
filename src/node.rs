//! Node model and arena storage.
//!
//! Leaves and internal nodes share one arena and are addressed by [`NodeId`].
//! Removed slots go on a free list and are reused by later allocations, so ids
//! are only stable while the node they name is alive.

/// Index of a node slot in the [`NodeArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which half of a prefix a bit selects: `0` is left, `1` is right.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    pub(crate) fn from_bit(bit: u128) -> Self {
        if bit & 1 == 0 {
            Side::Left
        } else {
            Side::Right
        }
    }

    #[inline]
    pub(crate) fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// One side of an internal node (or the root).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ChildRef {
    /// Only the root of an empty trie has empty sides.
    Empty,
    /// A real subtree: an internal node, or a leaf at the deepest level.
    Child(NodeId),
    /// No subtree on this side. Points at the smallest leaf of the right
    /// subtree when on the left, and at the largest leaf of the left subtree
    /// when on the right.
    Descendant(NodeId),
}

/// A stored value, threaded into the ascending leaf list.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Leaf {
    pub value: u128,
    pub pred: Option<NodeId>,
    pub succ: Option<NodeId>,
}

/// A prefix shared by every leaf beneath it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Internal {
    pub prefix: u128,
    pub left: ChildRef,
    pub right: ChildRef,
}

impl Internal {
    pub(crate) fn new(prefix: u128) -> Self {
        Self {
            prefix,
            left: ChildRef::Empty,
            right: ChildRef::Empty,
        }
    }

    #[inline]
    pub(crate) fn get(&self, side: Side) -> ChildRef {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[inline]
    pub(crate) fn set(&mut self, side: Side, child: ChildRef) {
        match side {
            Side::Left => self.left = child,
            Side::Right => self.right = child,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Node {
    Leaf(Leaf),
    Internal(Internal),
    Vacant,
}

/// Slot arena for trie nodes, with a free list of vacated slots.
#[derive(Clone, Debug, Default)]
pub(crate) struct NodeArena {
    slots: Vec<Node>,
    free: Vec<NodeId>,
}

impl NodeArena {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        debug_assert!(!matches!(node, Node::Vacant));
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = node;
            return id;
        }
        let id = NodeId(
            u32::try_from(self.slots.len()).expect("node arena exceeds u32::MAX slots"),
        );
        self.slots.push(node);
        id
    }

    pub(crate) fn free(&mut self, id: NodeId) {
        let slot = &mut self.slots[id.index()];
        debug_assert!(!matches!(slot, Node::Vacant), "double free of {id:?}");
        *slot = Node::Vacant;
        self.free.push(id);
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> &Node {
        &self.slots[id.index()]
    }

    #[inline]
    pub(crate) fn leaf(&self, id: NodeId) -> &Leaf {
        match &self.slots[id.index()] {
            Node::Leaf(leaf) => leaf,
            other => panic!("{id:?} is not a leaf: {other:?}"),
        }
    }

    #[inline]
    pub(crate) fn leaf_mut(&mut self, id: NodeId) -> &mut Leaf {
        match &mut self.slots[id.index()] {
            Node::Leaf(leaf) => leaf,
            other => panic!("{id:?} is not a leaf: {other:?}"),
        }
    }

    #[inline]
    pub(crate) fn internal(&self, id: NodeId) -> &Internal {
        match &self.slots[id.index()] {
            Node::Internal(node) => node,
            other => panic!("{id:?} is not an internal node: {other:?}"),
        }
    }

    #[inline]
    pub(crate) fn internal_mut(&mut self, id: NodeId) -> &mut Internal {
        match &mut self.slots[id.index()] {
            Node::Internal(node) => node,
            other => panic!("{id:?} is not an internal node: {other:?}"),
        }
    }

    /// Number of live (non-vacant) nodes.
    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub(crate) fn capacity_bytes(&self) -> usize {
        self.slots.capacity() * std::mem::size_of::<Node>()
            + self.free.capacity() * std::mem::size_of::<NodeId>()
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        // Trailing vacant slots can be dropped outright.
        while matches!(self.slots.last(), Some(Node::Vacant)) {
            self.slots.pop();
        }
        let len = self.slots.len();
        self.free.retain(|id| id.index() < len);
        self.slots.shrink_to_fit();
        self.free.shrink_to_fit();
    }
}
