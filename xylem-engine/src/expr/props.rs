use bitflags::bitflags;

bitflags! {
    /// Statically inferred invariants of an expression, used to drive
    /// optimizer decisions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SpecialProperties: u16 {
        /// All result nodes belong to the document of the context node.
        const CONTEXT_DOCUMENT_NODESET = 1 << 0;
        /// All result nodes belong to one document.
        const SINGLE_DOCUMENT_NODESET = 1 << 1;
        /// Result nodes are delivered in document order, without
        /// duplicates.
        const ORDERED_NODESET = 1 << 2;
        /// Result nodes are delivered in reverse document order.
        const REVERSE_DOCUMENT_ORDER = 1 << 3;
        /// No result node is an ancestor of another.
        const PEER_NODESET = 1 << 4;
        /// All result nodes are within the subtree of the context node.
        const SUBTREE_NODESET = 1 << 5;
        /// Evaluation creates no new nodes and has no side effects.
        const NON_CREATIVE = 1 << 6;
        /// The result does not depend on the focus.
        const CONTEXT_INDEPENDENT = 1 << 7;
    }
}
