use super::*;
use crate::types::Item;

fn store_with(ids: &[i64]) -> ItemStore {
    let mut store = ItemStore::new();
    store.replace_all(ids.iter().map(|id| Item {
        id: MemoryId::from(*id),
        image: format!("https://cdn.example/{id}.jpg"),
        tags: Vec::new(),
        location: "Desk".to_string(),
        score: 0.0,
        created_at: None,
    }));
    store
}

#[test]
fn session_start_requests_listing() {
    let mut view = ViewState::new();
    let commands = view.apply(ViewEvent::SessionStarted, &ItemStore::new());
    assert_eq!(commands, vec![Command::FetchAll]);
    assert_eq!(view.mode(), Mode::Browse);
}

#[test]
fn search_input_expands_stack_and_requests_search() {
    let mut view = ViewState::new();
    let commands = view.apply(ViewEvent::SearchInput("keys".to_string()), &ItemStore::new());

    assert_eq!(commands, vec![Command::Search("keys".to_string())]);
    assert!(view.search_active());
    assert!(view.stack_expanded());
    assert_eq!(view.query(), "keys");
}

#[test]
fn clearing_search_input_reloads_listing_and_keeps_stack() {
    let mut view = ViewState::new();
    let store = ItemStore::new();
    view.apply(ViewEvent::SearchInput("keys".to_string()), &store);

    let commands = view.apply(ViewEvent::SearchInput("  ".to_string()), &store);

    assert_eq!(commands, vec![Command::FetchAll]);
    assert!(!view.search_active());
    assert!(view.stack_expanded());
}

#[test]
fn stack_taps_toggle_expansion() {
    let mut view = ViewState::new();
    let store = ItemStore::new();

    assert!(view.apply(ViewEvent::StackTapped, &store).is_empty());
    assert!(view.stack_expanded());
    view.apply(ViewEvent::CollapseTapped, &store);
    assert!(!view.stack_expanded());
}

#[test]
fn add_new_mode_never_shows_expanded_stack() {
    let mut view = ViewState::new();
    let store = ItemStore::new();
    view.apply(ViewEvent::StackTapped, &store);

    view.apply(ViewEvent::TabSelected(Mode::AddNew), &store);
    assert_eq!(view.mode(), Mode::AddNew);
    assert!(!view.stack_expanded());

    view.apply(ViewEvent::StackTapped, &store);
    assert!(!view.stack_expanded());

    view.apply(ViewEvent::TabSelected(Mode::Browse), &store);
    assert!(view.stack_expanded());
}

#[test]
fn edit_request_for_unknown_item_is_ignored() {
    let mut view = ViewState::new();
    let store = store_with(&[1]);

    view.apply(ViewEvent::EditRequested(MemoryId::from(7)), &store);
    assert_eq!(view.editing(), None);

    view.apply(ViewEvent::EditRequested(MemoryId::from(1)), &store);
    assert_eq!(view.editing(), Some(&MemoryId::from(1)));
}

#[test]
fn edit_submit_targets_the_item_being_edited() {
    let mut view = ViewState::new();
    let store = store_with(&[1]);
    view.apply(ViewEvent::EditRequested(MemoryId::from(1)), &store);

    let commands = view.apply(
        ViewEvent::EditSubmitted {
            location: "Drawer".to_string(),
            tags: "keys, metal".to_string(),
        },
        &store,
    );

    assert_eq!(
        commands,
        vec![Command::Update {
            id: MemoryId::from(1),
            location: "Drawer".to_string(),
            tags: "keys, metal".to_string(),
        }]
    );
    assert_eq!(view.editing(), Some(&MemoryId::from(1)));

    view.apply(ViewEvent::EditSaved, &store);
    assert_eq!(view.editing(), None);
}

#[test]
fn edit_submit_without_edit_target_does_nothing() {
    let mut view = ViewState::new();
    let commands = view.apply(
        ViewEvent::EditSubmitted {
            location: "Drawer".to_string(),
            tags: String::new(),
        },
        &ItemStore::new(),
    );
    assert!(commands.is_empty());
}

#[test]
fn deleting_the_edited_item_closes_the_editor() {
    let mut view = ViewState::new();
    let store = store_with(&[1, 2]);
    view.apply(ViewEvent::EditRequested(MemoryId::from(1)), &store);

    let commands = view.apply(ViewEvent::DeleteConfirmed(MemoryId::from(1)), &store);
    assert_eq!(commands, vec![Command::Delete(MemoryId::from(1))]);

    view.apply(ViewEvent::ItemDeleted(MemoryId::from(2)), &store);
    assert_eq!(view.editing(), Some(&MemoryId::from(1)));
    view.apply(ViewEvent::ItemDeleted(MemoryId::from(1)), &store);
    assert_eq!(view.editing(), None);
}

#[test]
fn upload_submit_uses_form_fields_and_created_item_resets_form() {
    let mut view = ViewState::new();
    let store = ItemStore::new();
    let photo = ImageUpload::new("keys.png", vec![1, 2, 3]);
    view.apply(ViewEvent::TabSelected(Mode::AddNew), &store);
    view.apply(ViewEvent::ImageSelected(photo.clone()), &store);
    view.apply(ViewEvent::UploadLocationChanged("Garage".to_string()), &store);
    view.apply(ViewEvent::UploadTagsChanged("tools".to_string()), &store);

    let commands = view.apply(ViewEvent::UploadSubmitted, &store);
    assert_eq!(
        commands,
        vec![Command::Create(CreateRequest {
            file: Some(photo),
            location: "Garage".to_string(),
            tags: "tools".to_string(),
        })]
    );
    assert_eq!(view.mode(), Mode::AddNew);

    view.apply(ViewEvent::ItemCreated, &store);
    assert_eq!(view.mode(), Mode::Browse);
    assert_eq!(view.upload(), &UploadForm::default());
}

#[test]
fn search_while_adding_updates_suspended_browse_state() {
    let mut view = ViewState::new();
    let store = ItemStore::new();
    view.apply(ViewEvent::TabSelected(Mode::AddNew), &store);

    let commands = view.apply(ViewEvent::SearchInput("mug".to_string()), &store);

    assert_eq!(commands, vec![Command::Search("mug".to_string())]);
    assert_eq!(view.mode(), Mode::AddNew);
    assert!(!view.stack_expanded());
    view.apply(ViewEvent::TabSelected(Mode::Browse), &store);
    assert!(view.stack_expanded());
    assert_eq!(view.query(), "mug");
}

#[test]
fn session_end_resets_everything() {
    let mut view = ViewState::new();
    let store = store_with(&[1]);
    view.apply(ViewEvent::SearchInput("keys".to_string()), &store);
    view.apply(ViewEvent::EditRequested(MemoryId::from(1)), &store);
    view.apply(ViewEvent::TabSelected(Mode::AddNew), &store);
    view.apply(ViewEvent::UploadLocationChanged("Garage".to_string()), &store);

    let commands = view.apply(ViewEvent::SessionEnded, &store);

    assert_eq!(commands, vec![Command::ClearItems]);
    assert_eq!(view, ViewState::default());
}
