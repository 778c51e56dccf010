//! Collections - a folder tree of request references plus a lookup table
//!
//! The tree only holds ids and owns ordering; the table owns the
//! [`RequestDefinition`] payloads. Every id in the tree has exactly one table
//! entry and every table entry is referenced exactly once. Fields are private
//! so the pair can only change through the operations below, each of which
//! validates before it mutates.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{new_id, CollectionId, FolderId, RequestDefinition, RequestId};
use crate::error::CollectionError;

/// A node in the collection tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CollectionItem {
    Request { id: RequestId },
    Folder(Folder),
}

/// A folder that can contain requests or sub-folders
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    id: FolderId,
    pub name: String,
    #[serde(default)]
    items: Vec<CollectionItem>,
}

impl Folder {
    fn new(name: impl Into<String>) -> Self {
        Folder {
            id: new_id(),
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn items(&self) -> &[CollectionItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A named, persisted group of requests
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CollectionFile")]
pub struct Collection {
    id: CollectionId,
    pub name: String,
    items: Vec<CollectionItem>,
    requests: BTreeMap<RequestId, RequestDefinition>,
}

/// On-disk shape, validated into a [`Collection`]
#[derive(Deserialize)]
struct CollectionFile {
    id: CollectionId,
    name: String,
    #[serde(default)]
    items: Vec<CollectionItem>,
    #[serde(default)]
    requests: BTreeMap<RequestId, RequestDefinition>,
}

impl TryFrom<CollectionFile> for Collection {
    type Error = CollectionError;

    fn try_from(file: CollectionFile) -> Result<Self, Self::Error> {
        let mut request_ids = HashSet::new();
        let mut folder_ids = HashSet::new();
        check_tree(&file.items, &mut request_ids, &mut folder_ids)?;

        for id in &request_ids {
            if !file.requests.contains_key(id) {
                return Err(CollectionError::DanglingReference(id.clone()));
            }
        }
        for (key, request) in &file.requests {
            if key != &request.id {
                return Err(CollectionError::KeyMismatch {
                    key: key.clone(),
                    id: request.id.clone(),
                });
            }
            if !request_ids.contains(key) {
                return Err(CollectionError::OrphanedRequest(key.clone()));
            }
        }

        Ok(Collection {
            id: file.id,
            name: file.name,
            items: file.items,
            requests: file.requests,
        })
    }
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Collection {
            id: new_id(),
            name: name.into(),
            items: Vec::new(),
            requests: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Top-level items in display order
    pub fn items(&self) -> &[CollectionItem] {
        &self.items
    }

    /// Number of requests anywhere in the tree
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn contains_request(&self, id: &str) -> bool {
        self.requests.contains_key(id)
    }

    pub fn request(&self, id: &str) -> Option<&RequestDefinition> {
        self.requests.get(id)
    }

    /// All requests, ordered by id
    pub fn requests(&self) -> impl Iterator<Item = &RequestDefinition> {
        self.requests.values()
    }

    /// Request ids in depth-first tree order
    pub fn request_ids(&self) -> Vec<RequestId> {
        let mut ids = Vec::with_capacity(self.requests.len());
        collect_request_ids(&self.items, &mut ids);
        ids
    }

    pub fn folder(&self, id: &str) -> Option<&Folder> {
        find_folder_ref(&self.items, id)
    }

    /// Depth-first search for a folder
    pub fn find_folder(&mut self, id: &str) -> Option<&mut Folder> {
        find_folder_in(&mut self.items, id)
    }

    /// Create an empty folder at the root or inside `parent`
    pub fn add_folder(
        &mut self,
        name: impl Into<String>,
        parent: Option<&str>,
    ) -> Result<FolderId, CollectionError> {
        let folder = Folder::new(name);
        let id = folder.id.clone();
        self.children_mut(parent)?.push(CollectionItem::Folder(folder));
        Ok(id)
    }

    /// Insert a request at the end of `parent` (or the root). A missing
    /// parent is reported and nothing is inserted.
    pub fn add_request(
        &mut self,
        request: RequestDefinition,
        parent: Option<&str>,
    ) -> Result<(), CollectionError> {
        if self.requests.contains_key(&request.id) {
            return Err(CollectionError::DuplicateRequest(request.id));
        }

        let id = request.id.clone();
        self.children_mut(parent)?
            .push(CollectionItem::Request { id: id.clone() });
        self.requests.insert(id, request);
        Ok(())
    }

    /// Replace the payload of an existing request; the tree is untouched
    pub fn update_request(
        &mut self,
        mut request: RequestDefinition,
    ) -> Result<(), CollectionError> {
        let slot = self
            .requests
            .get_mut(&request.id)
            .ok_or_else(|| CollectionError::RequestNotFound(request.id.clone()))?;
        request.touch();
        *slot = request;
        Ok(())
    }

    /// Remove a request from both the tree and the lookup table
    pub fn remove_request(&mut self, id: &str) -> Result<RequestDefinition, CollectionError> {
        if !self.requests.contains_key(id) {
            return Err(CollectionError::RequestNotFound(id.to_string()));
        }

        remove_request_ref(&mut self.items, id);
        self.requests
            .remove(id)
            .ok_or_else(|| CollectionError::RequestNotFound(id.to_string()))
    }

    /// Remove a folder with everything below it, returning the dropped requests
    pub fn remove_folder(&mut self, id: &str) -> Result<Vec<RequestDefinition>, CollectionError> {
        let folder = remove_folder_in(&mut self.items, id)
            .ok_or_else(|| CollectionError::FolderNotFound(id.to_string()))?;

        let mut ids = Vec::new();
        collect_request_ids(&folder.items, &mut ids);
        Ok(ids
            .iter()
            .filter_map(|request_id| self.requests.remove(request_id))
            .collect())
    }

    /// Re-parent a request. Only the tree reference moves.
    pub fn move_request(&mut self, id: &str, parent: Option<&str>) -> Result<(), CollectionError> {
        if !self.requests.contains_key(id) {
            return Err(CollectionError::RequestNotFound(id.to_string()));
        }
        if let Some(folder_id) = parent {
            if self.folder(folder_id).is_none() {
                return Err(CollectionError::FolderNotFound(folder_id.to_string()));
            }
        }

        remove_request_ref(&mut self.items, id);
        self.children_mut(parent)?
            .push(CollectionItem::Request { id: id.to_string() });
        Ok(())
    }

    fn children_mut(
        &mut self,
        parent: Option<&str>,
    ) -> Result<&mut Vec<CollectionItem>, CollectionError> {
        match parent {
            None => Ok(&mut self.items),
            Some(folder_id) => find_folder_in(&mut self.items, folder_id)
                .map(|folder| &mut folder.items)
                .ok_or_else(|| CollectionError::FolderNotFound(folder_id.to_string())),
        }
    }
}

fn find_folder_in<'a>(items: &'a mut [CollectionItem], id: &str) -> Option<&'a mut Folder> {
    for item in items.iter_mut() {
        if let CollectionItem::Folder(folder) = item {
            if folder.id == id {
                return Some(folder);
            }
            if let Some(found) = find_folder_in(&mut folder.items, id) {
                return Some(found);
            }
        }
    }
    None
}

fn find_folder_ref<'a>(items: &'a [CollectionItem], id: &str) -> Option<&'a Folder> {
    items.iter().find_map(|item| match item {
        CollectionItem::Folder(folder) if folder.id == id => Some(folder),
        CollectionItem::Folder(folder) => find_folder_ref(&folder.items, id),
        CollectionItem::Request { .. } => None,
    })
}

fn remove_request_ref(items: &mut Vec<CollectionItem>, id: &str) -> bool {
    if let Some(pos) = items
        .iter()
        .position(|item| {
            matches!(item, CollectionItem::Request { id: request_id } if request_id == id)
        })
    {
        items.remove(pos);
        return true;
    }

    for item in items.iter_mut() {
        if let CollectionItem::Folder(folder) = item {
            if remove_request_ref(&mut folder.items, id) {
                return true;
            }
        }
    }

    false
}

fn remove_folder_in(items: &mut Vec<CollectionItem>, id: &str) -> Option<Folder> {
    if let Some(pos) = items
        .iter()
        .position(|item| matches!(item, CollectionItem::Folder(folder) if folder.id == id))
    {
        return match items.remove(pos) {
            CollectionItem::Folder(folder) => Some(folder),
            CollectionItem::Request { .. } => None,
        };
    }

    items.iter_mut().find_map(|item| match item {
        CollectionItem::Folder(folder) => remove_folder_in(&mut folder.items, id),
        CollectionItem::Request { .. } => None,
    })
}

fn collect_request_ids(items: &[CollectionItem], out: &mut Vec<RequestId>) {
    for item in items {
        match item {
            CollectionItem::Request { id } => out.push(id.clone()),
            CollectionItem::Folder(folder) => collect_request_ids(&folder.items, out),
        }
    }
}

fn check_tree(
    items: &[CollectionItem],
    request_ids: &mut HashSet<RequestId>,
    folder_ids: &mut HashSet<FolderId>,
) -> Result<(), CollectionError> {
    for item in items {
        match item {
            CollectionItem::Request { id } => {
                if !request_ids.insert(id.clone()) {
                    return Err(CollectionError::DuplicateRequest(id.clone()));
                }
            }
            CollectionItem::Folder(folder) => {
                if !folder_ids.insert(folder.id.clone()) {
                    return Err(CollectionError::DuplicateFolder(folder.id.clone()));
                }
                check_tree(&folder.items, request_ids, folder_ids)?;
            }
        }
    }
    Ok(())
}
