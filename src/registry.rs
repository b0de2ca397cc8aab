//! Known event types and the sources that publish them.

use log::debug;

/// Upstream schedule publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Team Liquid calendar.
    TeamLiquid,
    /// PlusForward calendar.
    PlusForward,
    /// Global Cycling Network race list.
    Gcn,
}

impl Source {
    /// All sources, in registry order.
    pub const ALL: [Source; 3] = [Source::TeamLiquid, Source::PlusForward, Source::Gcn];

    /// Label that selects every type of this source.
    pub fn label(self) -> &'static str {
        match self {
            Source::TeamLiquid => "tl",
            Source::PlusForward => "pfw",
            Source::Gcn => "gcn",
        }
    }

    /// Resolves a source label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }

    /// Registry entries published by this source.
    pub fn types(self) -> impl Iterator<Item = &'static EventType> {
        EVENT_TYPES.iter().filter(move |t| t.sources.contains(&self))
    }
}

/// One registry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventType {
    /// Partition key used in storage paths.
    pub id: &'static str,
    /// Human readable name.
    pub display_name: &'static str,
    /// Suggested feed color.
    pub color_hint: &'static str,
    /// Publishers carrying this type.
    pub sources: &'static [Source],
}

const TL: &[Source] = &[Source::TeamLiquid];
const PFW: &[Source] = &[Source::PlusForward];
const GCN: &[Source] = &[Source::Gcn];

/// Every known event type.
pub static EVENT_TYPES: &[EventType] = &[
    EventType { id: "sc2", display_name: "StarCraft II", color_hint: "#1f6fb2", sources: TL },
    EventType { id: "scrm", display_name: "StarCraft: Remastered", color_hint: "#3b5998", sources: TL },
    EventType { id: "bw", display_name: "StarCraft: Brood War", color_hint: "#4a4a8c", sources: TL },
    EventType { id: "csgo", display_name: "Counter-Strike", color_hint: "#d98c1f", sources: TL },
    EventType { id: "hots", display_name: "Heroes of the Storm", color_hint: "#6a2c91", sources: TL },
    EventType { id: "smash", display_name: "Super Smash Bros.", color_hint: "#c0392b", sources: TL },
    EventType { id: "dota", display_name: "Dota 2", color_hint: "#a12a1f", sources: TL },
    EventType { id: "lol", display_name: "League of Legends", color_hint: "#c8aa6e", sources: TL },
    EventType {
        id: "ovw",
        display_name: "Overwatch",
        color_hint: "#f99e1a",
        sources: &[Source::TeamLiquid, Source::PlusForward],
    },
    EventType { id: "qlv", display_name: "Quake Live", color_hint: "#8b0000", sources: PFW },
    EventType { id: "qiv", display_name: "Quake 4", color_hint: "#7a1f1f", sources: PFW },
    EventType { id: "qiii", display_name: "Quake III Arena", color_hint: "#9c2a00", sources: PFW },
    EventType { id: "qii", display_name: "Quake II", color_hint: "#6b3e26", sources: PFW },
    EventType { id: "qw", display_name: "QuakeWorld", color_hint: "#5c4033", sources: PFW },
    EventType { id: "dbt", display_name: "Diabotical", color_hint: "#00a3e0", sources: PFW },
    EventType { id: "doom", display_name: "Doom", color_hint: "#b22222", sources: PFW },
    EventType { id: "rfl", display_name: "Reflex Arena", color_hint: "#2e8b57", sources: PFW },
    EventType { id: "gg", display_name: "Gladiator", color_hint: "#708090", sources: PFW },
    EventType { id: "ut", display_name: "Unreal Tournament", color_hint: "#4169e1", sources: PFW },
    EventType { id: "wsw", display_name: "Warsow", color_hint: "#ff8c00", sources: PFW },
    EventType { id: "dbmb", display_name: "Dbmb", color_hint: "#696969", sources: PFW },
    EventType { id: "xnt", display_name: "Xonotic", color_hint: "#1e90ff", sources: PFW },
    EventType { id: "qch", display_name: "Quake Champions", color_hint: "#a0522d", sources: PFW },
    EventType { id: "cpma", display_name: "Challenge ProMode Arena", color_hint: "#556b2f", sources: PFW },
    EventType { id: "gr", display_name: "Gravel", color_hint: "#a67b5b", sources: GCN },
    EventType { id: "cx", display_name: "Cyclocross", color_hint: "#6b8e23", sources: GCN },
    EventType { id: "road", display_name: "Road", color_hint: "#2f4f4f", sources: GCN },
    EventType { id: "mtb", display_name: "Mountain Bike", color_hint: "#8b4513", sources: GCN },
];

/// Looks up a type id.
pub fn lookup(id: &str) -> Option<&'static EventType> {
    EVENT_TYPES.iter().find(|t| t.id == id)
}

/// True when `id` names a registered type.
pub fn is_valid_type(id: &str) -> bool {
    lookup(id).is_some()
}

/// Ids of every registered type.
pub fn valid_types() -> impl Iterator<Item = &'static str> {
    EVENT_TYPES.iter().map(|t| t.id)
}

/// Resolves user supplied labels into type ids.
///
/// Source labels expand to all their types, type ids pass through and
/// unknown labels are dropped. Output is deduplicated, first occurrence wins.
pub fn expand<I, S>(labels: I) -> Vec<&'static str>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<&'static str> = Vec::new();
    let mut push = |id: &'static str| {
        if !out.contains(&id) {
            out.push(id);
        }
    };
    for label in labels {
        let label = label.as_ref();
        if let Some(source) = Source::from_label(label) {
            source.types().for_each(|t| push(t.id));
        } else if let Some(t) = lookup(label) {
            push(t.id);
        } else {
            debug!("ignoring unknown event type {label:?}");
        }
    }
    out
}
