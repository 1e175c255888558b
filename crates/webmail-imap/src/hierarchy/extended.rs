//! Level-by-level listing with `LIST-EXTENDED` (RFC 5258).

use super::{MailboxNode, leads_to, sort_level};
use crate::connection::{Connector, Session};
use crate::Result;

impl<C: Connector> Session<C> {
    /// Lists the level below `top` and, as long as one of its folders
    /// leads to `until`, the level below that folder.
    pub(super) async fn list_extended_tree(
        &mut self,
        top: Option<&str>,
        until: Option<&str>,
        delimiter: char,
    ) -> Result<Vec<MailboxNode>> {
        // Each entry is a listed level and the index of the folder whose
        // children make up the next one.
        let mut levels: Vec<(Vec<MailboxNode>, Option<usize>)> = Vec::new();
        let mut parent = top.map(str::to_string);

        loop {
            let pattern = match &parent {
                Some(parent) => format!("{parent}{delimiter}%"),
                None => "%".to_string(),
            };
            let result = self.connected()?.list_extended("", &pattern).await;
            let mut nodes: Vec<MailboxNode> = self
                .track(result)?
                .iter()
                .map(|response| MailboxNode::from_list(response, delimiter))
                .collect();
            sort_level(&mut nodes);

            let deeper = |node: &MailboxNode| {
                parent
                    .as_ref()
                    .is_none_or(|parent| node.path.len() > parent.len())
            };
            let next = nodes.iter().position(|node| {
                node.has_children() && deeper(node) && leads_to(until, &node.path, delimiter)
            });
            parent = next.map(|index| nodes[index].path.clone());
            levels.push((nodes, next));
            if parent.is_none() {
                break;
            }
        }

        let mut below: Option<Vec<MailboxNode>> = None;
        while let Some((mut nodes, next)) = levels.pop() {
            if let (Some(index), Some(children)) = (next, below.take()) {
                nodes[index].children = Some(children);
            }
            below = Some(nodes);
        }
        Ok(below.unwrap_or_default())
    }
}
