//! Create / update / delete helpers over the record lists
//!
//! Every helper takes the current list and returns a new one; callers swap
//! the result into state wholesale.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::*;

/// A record kept in one list of [`AppData`] and mirrored to one sheet /
/// Firestore collection of the same name.
pub trait Record: Clone + PartialEq + Serialize + DeserializeOwned + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn list(data: &AppData) -> &Vec<Self>;
    fn list_mut(data: &mut AppData) -> &mut Vec<Self>;

    /// Hook for records that own nested lists which must start empty
    fn on_create(&mut self) {}
}

macro_rules! impl_record {
    ($ty:ty, $collection:expr, $field:ident) => {
        impl_record!($ty, $collection, $field, |_item: &mut $ty| {});
    };
    ($ty:ty, $collection:expr, $field:ident, $on_create:expr) => {
        impl Record for $ty {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn list(data: &AppData) -> &Vec<Self> {
                &data.$field
            }

            fn list_mut(data: &mut AppData) -> &mut Vec<Self> {
                &mut data.$field
            }

            fn on_create(&mut self) {
                let hook: fn(&mut $ty) = $on_create;
                hook(self);
            }
        }
    };
}

impl_record!(TrafficAccident, "trafficAccidents", traffic_accidents);
impl_record!(VehicleRegistration, "vehicleRegistrations", vehicle_registrations);
impl_record!(Event, "events", events, |e: &mut Event| e.targets.clear());
impl_record!(DailyTask, "dailyTasks", daily_tasks);
impl_record!(VerificationRequest, "verificationRequests", verification_requests);
impl_record!(AdvisoryDocument, "advisoryDocuments", advisory_documents);

/// Fresh opaque id for a new record
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Appends `item` with a newly generated id
pub fn create<T: Record>(list: &[T], mut item: T) -> Vec<T> {
    item.set_id(new_id());
    item.on_create();
    let mut out = list.to_vec();
    out.push(item);
    out
}

/// Replaces the record with the same id; unknown ids leave the list as is
pub fn update<T: Record>(list: &[T], item: T) -> Vec<T> {
    list.iter()
        .map(|existing| if existing.id() == item.id() { item.clone() } else { existing.clone() })
        .collect()
}

pub fn delete<T: Record>(list: &[T], id: &str) -> Vec<T> {
    list.iter().filter(|r| r.id() != id).cloned().collect()
}

// ============================================
// Event targets
// ============================================

pub fn add_event_target(events: &[Event], event_id: &str, mut target: EventTarget) -> Vec<Event> {
    target.id = new_id();
    target.results.clear();
    events
        .iter()
        .map(|event| {
            if event.id == event_id {
                let mut event = event.clone();
                event.targets.push(target.clone());
                event
            } else {
                event.clone()
            }
        })
        .collect()
}

/// Records `value` for `date`, replacing any earlier figure for that date
pub fn upsert_target_result(
    events: &[Event],
    event_id: &str,
    target_id: &str,
    date: &str,
    value: f64,
) -> Vec<Event> {
    events
        .iter()
        .map(|event| {
            if event.id != event_id {
                return event.clone();
            }
            let targets = event
                .targets
                .iter()
                .map(|target| {
                    if target.id != target_id {
                        return target.clone();
                    }
                    let mut target = target.clone();
                    match target.results.iter_mut().find(|r| r.date == date) {
                        Some(existing) => existing.result = value,
                        None => target.results.push(EventTargetResult {
                            date: date.to_string(),
                            result: value,
                        }),
                    }
                    target
                })
                .collect();
            Event { targets, ..event.clone() }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, description: &str) -> DailyTask {
        DailyTask {
            id: id.to_string(),
            date: "2024-05-01".to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_assigns_fresh_id() {
        let list = vec![task("a", "first")];
        let out = create(&list, task("", "second"));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], list[0]);
        assert!(!out[1].id.is_empty());
        assert_ne!(out[1].id, "a");
        assert_eq!(out[1].description, "second");
    }

    #[test]
    fn test_create_event_drops_incoming_targets() {
        let event = Event {
            name: "Cao điểm".into(),
            targets: vec![EventTarget { name: "x".into(), ..Default::default() }],
            ..Default::default()
        };
        let out = create(&[], event);
        assert!(out[0].targets.is_empty());
    }

    #[test]
    fn test_update_replaces_matching_id() {
        let list = vec![task("a", "old"), task("b", "keep")];
        let out = update(&list, task("a", "new"));
        assert_eq!(out[0].description, "new");
        assert_eq!(out[1].description, "keep");
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let list = vec![task("a", "old"), task("b", "keep")];
        assert_eq!(update(&list, task("zzz", "new")), list);
    }

    #[test]
    fn test_delete() {
        let list = vec![task("a", "x"), task("b", "y")];
        let out = delete(&list, "a");
        assert_eq!(out, vec![task("b", "y")]);
        assert_eq!(delete(&list, "missing"), list);
    }

    #[test]
    fn test_add_event_target_and_upsert_result() {
        let events = vec![
            Event { id: "e1".into(), ..Default::default() },
            Event { id: "e2".into(), ..Default::default() },
        ];
        let target = EventTarget {
            name: "Xử lý vi phạm".into(),
            goal: 100.0,
            results: vec![EventTargetResult { date: "2020-01-01".into(), result: 9.0 }],
            ..Default::default()
        };
        let events = add_event_target(&events, "e1", target);
        assert_eq!(events[0].targets.len(), 1);
        assert!(events[0].targets[0].results.is_empty());
        assert!(events[1].targets.is_empty());

        let target_id = events[0].targets[0].id.clone();
        let events = upsert_target_result(&events, "e1", &target_id, "2024-05-01", 5.0);
        let events = upsert_target_result(&events, "e1", &target_id, "2024-05-02", 3.0);
        let events = upsert_target_result(&events, "e1", &target_id, "2024-05-01", 7.0);

        let results = &events[0].targets[0].results;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], EventTargetResult { date: "2024-05-01".into(), result: 7.0 });
        assert_eq!(events[0].targets[0].achieved(), 10.0);
    }

    #[test]
    fn test_upsert_unknown_target_is_noop() {
        let events = vec![Event { id: "e1".into(), ..Default::default() }];
        assert_eq!(upsert_target_result(&events, "e1", "nope", "2024-01-01", 1.0), events);
        assert_eq!(upsert_target_result(&events, "e9", "nope", "2024-01-01", 1.0), events);
    }
}
