//! In-memory [`RemoteStorage`] for tests.
//!
//! Folders and files live in a mutex-guarded table. Uploads can be made
//! to fail on a chosen call to exercise partial-publish handling.

use std::sync::{Mutex, MutexGuard};

use tally_core::{CoreError, FOLDER_MIME_TYPE, RemoteFile, RemoteFolder, RemoteStorage};

/// How an injected upload failure presents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// The service rejects the file.
    Rejected,
    /// The service rejects the credentials.
    Unauthorized,
}

#[derive(Debug, Clone)]
struct Object {
    id: String,
    parent: String,
    name: String,
    mime_type: String,
    content: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    objects: Vec<Object>,
    next_id: usize,
    upload_calls: usize,
    fail_at: Option<(usize, InjectedFailure)>,
}

/// In-memory storage rooted at a fixed folder id.
#[derive(Debug)]
pub struct MemoryStorage {
    root_id: String,
    state: Mutex<State>,
}

impl MemoryStorage {
    /// Creates empty storage whose root folder is `root_id`.
    pub fn new(root_id: &str) -> Self {
        Self {
            root_id: root_id.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    /// Root folder id.
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Makes the `nth` upload call (1-based, counted from now) fail once.
    pub fn fail_upload(&self, nth: usize, failure: InjectedFailure) {
        let mut state = self.state();
        let at = state.upload_calls + nth;
        state.fail_at = Some((at, failure));
    }

    /// Removes any pending injected failure.
    pub fn clear_failure(&self) {
        self.state().fail_at = None;
    }

    /// Number of upload calls made so far.
    pub fn upload_calls(&self) -> usize {
        self.state().upload_calls
    }

    /// Number of folders below the root.
    pub fn folder_count(&self) -> usize {
        self.state()
            .objects
            .iter()
            .filter(|o| o.mime_type == FOLDER_MIME_TYPE)
            .count()
    }

    /// Parent id of an object.
    pub fn parent_of(&self, id: &str) -> Option<String> {
        self.state()
            .objects
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.parent.clone())
    }

    /// Sorted names of the files (not folders) under `parent_id`.
    pub fn file_names(&self, parent_id: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .state()
            .objects
            .iter()
            .filter(|o| o.parent == parent_id && o.mime_type != FOLDER_MIME_TYPE)
            .map(|o| o.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Content of the file `name` under `parent_id`.
    pub fn content(&self, parent_id: &str, name: &str) -> Option<Vec<u8>> {
        self.state()
            .objects
            .iter()
            .find(|o| o.parent == parent_id && o.name == name && o.mime_type != FOLDER_MIME_TYPE)
            .map(|o| o.content.clone())
    }

    /// Stores a file directly, bypassing upload counting.
    pub fn put_file(&self, parent_id: &str, name: &str, content: &[u8]) -> String {
        let mut state = self.state();
        let id = allocate(&mut state, "file");
        state.objects.push(Object {
            id: id.clone(),
            parent: parent_id.to_string(),
            name: name.to_string(),
            mime_type: tally_core::CSV_MIME_TYPE.to_string(),
            content: content.to_vec(),
        });
        id
    }
}

fn allocate(state: &mut State, prefix: &str) -> String {
    state.next_id += 1;
    format!("{prefix}-{}", state.next_id)
}

fn to_remote(object: &Object) -> RemoteFile {
    RemoteFile {
        id: object.id.clone(),
        name: object.name.clone(),
        mime_type: object.mime_type.clone(),
        modified_time: None,
    }
}

impl RemoteStorage for MemoryStorage {
    async fn find_folder(&self, parent_id: &str, name: &str) -> Result<Option<RemoteFolder>, CoreError> {
        Ok(self
            .state()
            .objects
            .iter()
            .find(|o| o.parent == parent_id && o.name == name && o.mime_type == FOLDER_MIME_TYPE)
            .map(|o| RemoteFolder {
                id: o.id.clone(),
                name: o.name.clone(),
            }))
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<RemoteFolder, CoreError> {
        let mut state = self.state();
        let id = allocate(&mut state, "folder");
        state.objects.push(Object {
            id: id.clone(),
            parent: parent_id.to_string(),
            name: name.to_string(),
            mime_type: FOLDER_MIME_TYPE.to_string(),
            content: Vec::new(),
        });
        Ok(RemoteFolder {
            id,
            name: name.to_string(),
        })
    }

    async fn find_file(&self, parent_id: &str, name: &str) -> Result<Option<RemoteFile>, CoreError> {
        Ok(self
            .state()
            .objects
            .iter()
            .find(|o| o.parent == parent_id && o.name == name && o.mime_type != FOLDER_MIME_TYPE)
            .map(to_remote))
    }

    async fn upload_file(
        &self,
        parent_id: &str,
        name: &str,
        mime_type: &str,
        content: Vec<u8>,
        existing_id: Option<&str>,
    ) -> Result<RemoteFile, CoreError> {
        let mut state = self.state();
        state.upload_calls += 1;

        if let Some((at, failure)) = state.fail_at {
            if at == state.upload_calls {
                state.fail_at = None;
                return Err(match failure {
                    InjectedFailure::Rejected => CoreError::Upload {
                        file: name.to_string(),
                        message: "injected rejection".to_string(),
                    },
                    InjectedFailure::Unauthorized => {
                        CoreError::Authentication("injected 401".to_string())
                    }
                });
            }
        }

        if let Some(id) = existing_id {
            let object = state
                .objects
                .iter_mut()
                .find(|o| o.id == id)
                .ok_or_else(|| CoreError::Upload {
                    file: name.to_string(),
                    message: format!("no object with id {id}"),
                })?;
            object.content = content;
            object.mime_type = mime_type.to_string();
            return Ok(to_remote(object));
        }

        let id = allocate(&mut state, "file");
        let object = Object {
            id,
            parent: parent_id.to_string(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            content,
        };
        let remote = to_remote(&object);
        state.objects.push(object);
        Ok(remote)
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, CoreError> {
        self.state()
            .objects
            .iter()
            .find(|o| o.id == file_id)
            .map(|o| o.content.clone())
            .ok_or_else(|| CoreError::Storage(format!("no object with id {file_id}")))
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<RemoteFile>, CoreError> {
        Ok(self
            .state()
            .objects
            .iter()
            .filter(|o| o.parent == parent_id)
            .map(to_remote)
            .collect())
    }
}
