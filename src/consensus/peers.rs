pub type NodeId = String;

#[derive(Debug, Clone)]
pub struct Peers {
    pub members: Vec<NodeId>,
}

impl Peers {
    pub fn new(members: Vec<NodeId>) -> Self {
        Peers { members }
    }

    /// Responses needed from other nodes, not counting the proposer itself.
    pub fn majority(&self) -> usize {
        self.members.len() / 2
    }

    pub fn is_member(&self, id: &str) -> bool {
        self.members.iter().any(|member| member == id)
    }

    pub fn others<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.members.iter().filter(move |member| member.as_str() != id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peers(n: usize) -> Peers {
        Peers::new((1..=n).map(|i| i.to_string()).collect())
    }

    #[test]
    fn test_majority_excludes_self() {
        assert_eq!(peers(5).majority(), 2);
        assert_eq!(peers(4).majority(), 2);
        assert_eq!(peers(3).majority(), 1);
    }

    #[test]
    fn test_others_skips_self() {
        let peers = peers(3);
        let others: Vec<&NodeId> = peers.others("2").collect();

        assert_eq!(others, vec!["1", "3"]);
        assert!(peers.is_member("3"));
        assert!(!peers.is_member("4"));
    }
}
