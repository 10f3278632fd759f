use std::collections::HashMap;

use crate::document::Element;

/// Canonical child sequence for a statement entry, per the target schema.
/// Only the elements this tool touches are listed; everything else passes
/// through after them.
pub const NTRY_ORDER: &[&str] = &[
    "NtryRef",
    "Amt",
    "CdtDbtInd",
    "RvslInd",
    "Sts",
    "BookgDt",
    "ValDt",
    "AcctSvcrRef",
    "Avlbty",
    "BkTxCd",
    "ComssnWvrInd",
    "Chrgs",
    "Intrst",
    "Card",
    "NtryDtls",
    "AddtlNtryInf",
];

/// Canonical child sequence for transaction details.
pub const TXDTLS_ORDER: &[&str] = &[
    "Refs",
    "AmtDtls",
    "Avlbty",
    "BkTxCd",
    "Chrgs",
    "Intrst",
    "RltdPties",
    "RltdAgts",
    "RltdDts",
    "RltdPric",
    "RltdQties",
    "FinInstrmId",
    "Tax",
    "RtrInf",
    "CorpActn",
    "SfkpgAcct",
    "CshDpst",
    "CardTx",
    "AddtlTxInf",
];

/// Rank assigned to children the table does not know; they sort after all
/// recognized children, keeping their original relative order.
const UNRECOGNIZED_RANK: usize = usize::MAX;

/// A canonical child ordering loaded once from its table and applied to any
/// number of parents.
#[derive(Debug, Clone)]
pub struct ChildOrdering {
    ranks: HashMap<&'static str, usize>,
}

impl ChildOrdering {
    pub fn new(order: &'static [&'static str]) -> Self {
        Self {
            ranks: order
                .iter()
                .enumerate()
                .map(|(rank, name)| (*name, rank))
                .collect(),
        }
    }

    /// Ordering for `Ntry` children.
    pub fn ntry() -> Self {
        Self::new(NTRY_ORDER)
    }

    /// Ordering for `TxDtls` children.
    pub fn tx_dtls() -> Self {
        Self::new(TXDTLS_ORDER)
    }

    fn rank(&self, name: &str) -> usize {
        self.ranks.get(name).copied().unwrap_or(UNRECOGNIZED_RANK)
    }

    /// Whether the children already follow the canonical sequence.
    pub fn is_canonical(&self, parent: &Element) -> bool {
        parent
            .children
            .windows(2)
            .all(|pair| self.rank(&pair[0].name) <= self.rank(&pair[1].name))
    }

    /// Stable partition-and-sort of the children by table rank. Unrecognized
    /// children keep their pairwise order after the recognized ones. Returns
    /// whether anything moved.
    pub fn reorder(&self, parent: &mut Element) -> bool {
        if parent.children.is_empty() || self.is_canonical(parent) {
            return false;
        }
        let mut keyed: Vec<(usize, usize, Element)> = parent
            .children
            .drain(..)
            .enumerate()
            .map(|(index, child)| (self.rank(&child.name), index, child))
            .collect();
        keyed.sort_by_key(|entry| (entry.0, entry.1));
        parent.children = keyed.into_iter().map(|(_, _, child)| child).collect();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent_with(names: &[&str]) -> Element {
        let mut parent = Element::new("Ntry");
        for name in names {
            parent.push_child(Element::new(*name));
        }
        parent
    }

    fn child_names(parent: &Element) -> Vec<&str> {
        parent.children.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_reorders_known_children() {
        let ordering = ChildOrdering::ntry();
        let mut parent = parent_with(&["AddtlNtryInf", "BkTxCd", "Amt", "CdtDbtInd"]);
        assert!(ordering.reorder(&mut parent));
        assert_eq!(
            child_names(&parent),
            vec!["Amt", "CdtDbtInd", "BkTxCd", "AddtlNtryInf"]
        );
    }

    #[test]
    fn test_unrecognized_children_keep_relative_order_after_known() {
        let ordering = ChildOrdering::ntry();
        let mut parent = parent_with(&["Custom2", "AddtlNtryInf", "Custom1", "Amt"]);
        assert!(ordering.reorder(&mut parent));
        assert_eq!(
            child_names(&parent),
            vec!["Amt", "AddtlNtryInf", "Custom2", "Custom1"]
        );
    }

    #[test]
    fn test_canonical_input_is_untouched() {
        let ordering = ChildOrdering::ntry();
        let mut parent = parent_with(&["Amt", "CdtDbtInd", "BookgDt", "ValDt", "BkTxCd"]);
        assert!(ordering.is_canonical(&parent));
        assert!(!ordering.reorder(&mut parent));
        assert_eq!(
            child_names(&parent),
            vec!["Amt", "CdtDbtInd", "BookgDt", "ValDt", "BkTxCd"]
        );
    }

    #[test]
    fn test_known_child_after_unknown_is_not_canonical() {
        let ordering = ChildOrdering::ntry();
        let parent = parent_with(&["Amt", "Custom", "BkTxCd"]);
        assert!(!ordering.is_canonical(&parent));
    }

    #[test]
    fn test_empty_parent_is_noop() {
        let ordering = ChildOrdering::ntry();
        let mut parent = Element::new("Ntry");
        assert!(!ordering.reorder(&mut parent));
    }

    #[test]
    fn test_tx_dtls_table() {
        let ordering = ChildOrdering::tx_dtls();
        let mut parent = parent_with(&["AddtlTxInf", "RltdPties", "Refs", "AmtDtls"]);
        assert!(ordering.reorder(&mut parent));
        assert_eq!(
            child_names(&parent),
            vec!["Refs", "AmtDtls", "RltdPties", "AddtlTxInf"]
        );
    }

    #[test]
    fn test_reorder_is_idempotent() {
        let ordering = ChildOrdering::ntry();
        let mut parent = parent_with(&["NtryDtls", "Sts", "Amt", "Other"]);
        assert!(ordering.reorder(&mut parent));
        let after_first = child_names(&parent)
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        assert!(!ordering.reorder(&mut parent));
        assert_eq!(
            child_names(&parent),
            after_first.iter().map(String::as_str).collect::<Vec<_>>()
        );
    }
}
