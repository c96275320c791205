//! Artist records as served by the upstream API and their joined form.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Serde helper treating an explicit JSON `null` like a missing field
///
/// Use with `#[serde(default, deserialize_with = "null_as_default")]`
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Artist entry from the listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtistSummary {
    pub id: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub members: Vec<String>,
    #[serde(default, rename = "creationDate", deserialize_with = "null_as_default")]
    pub creation_date: i32,
    #[serde(default, rename = "firstAlbum", deserialize_with = "null_as_default")]
    pub first_album: String,
    /// URL of the locations fragment
    #[serde(default, deserialize_with = "null_as_default")]
    pub locations: String,
    /// URL of the concert dates fragment
    #[serde(default, rename = "concertDates", deserialize_with = "null_as_default")]
    pub concert_dates: String,
    /// URL of the relations fragment
    #[serde(default, deserialize_with = "null_as_default")]
    pub relations: String,
}

impl ArtistSummary {
    /// Year of the first album, taken from the last four characters of the
    /// stored date string (`DD-MM-YYYY`).
    ///
    /// Returns `None` when the string is too short or the tail is not an
    /// integer.
    pub fn first_album_year(&self) -> Option<i32> {
        let value = self.first_album.trim();
        let start = value.len().checked_sub(4)?;
        value.get(start..)?.parse().ok()
    }
}

/// One of the three per-artist sub-resources
pub trait Fragment: Default {
    /// Human readable kind, used in logs and reports
    const KIND: FragmentKind;

    /// Identifier reported by the source for this fragment
    fn id(&self) -> u32;

    /// Empty fragment attributed to `artist_id`
    fn empty_for(artist_id: u32) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Locations,
    ConcertDates,
    Relations,
}

impl std::fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FragmentKind::Locations => write!(f, "locations"),
            FragmentKind::ConcertDates => write!(f, "concert_dates"),
            FragmentKind::Relations => write!(f, "relations"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocationsFragment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConcertDatesFragment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dates: Vec<String>,
}

/// Venue to dates join table for one artist
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationsFragment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u32,
    #[serde(default, rename = "datesLocations", deserialize_with = "null_as_default")]
    pub dates_locations: BTreeMap<String, Vec<String>>,
}

impl Fragment for LocationsFragment {
    const KIND: FragmentKind = FragmentKind::Locations;

    fn id(&self) -> u32 {
        self.id
    }

    fn empty_for(artist_id: u32) -> Self {
        Self {
            id: artist_id,
            ..Default::default()
        }
    }
}

impl Fragment for ConcertDatesFragment {
    const KIND: FragmentKind = FragmentKind::ConcertDates;

    fn id(&self) -> u32 {
        self.id
    }

    fn empty_for(artist_id: u32) -> Self {
        Self {
            id: artist_id,
            ..Default::default()
        }
    }
}

impl Fragment for RelationsFragment {
    const KIND: FragmentKind = FragmentKind::Relations;

    fn id(&self) -> u32 {
        self.id
    }

    fn empty_for(artist_id: u32) -> Self {
        Self {
            id: artist_id,
            ..Default::default()
        }
    }
}

/// An artist joined with its locations, concert dates and relations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompositeRecord {
    pub artist: ArtistSummary,
    pub locations: LocationsFragment,
    pub concert_dates: ConcertDatesFragment,
    pub relations: RelationsFragment,
}

impl CompositeRecord {
    pub fn id(&self) -> u32 {
        self.artist.id
    }

    pub fn member_count(&self) -> usize {
        self.artist.members.len()
    }
}
