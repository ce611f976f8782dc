use client::SessionStore;
use web_sys::Storage;

const SESSION_KEY: &str = "session";

fn local_storage() -> Option<Storage> {
    web_sys::window()?.local_storage().ok()?
}

pub fn load_session() -> SessionStore {
    local_storage()
        .and_then(|s| s.get_item(SESSION_KEY).ok().flatten())
        .map(|raw| SessionStore::from_json(&raw))
        .unwrap_or_default()
}

pub fn save_session(store: &SessionStore) {
    let Some(storage) = local_storage() else {
        return;
    };
    let _ = match store.to_json() {
        Some(raw) => storage.set_item(SESSION_KEY, &raw),
        None => storage.remove_item(SESSION_KEY),
    };
}
