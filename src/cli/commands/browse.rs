//! Read commands against the index.
//!
//! These never go through the scan orchestrator. The index file is locked by
//! whichever process opened it, so while `scan` runs in another process they
//! fail with "scan in progress" instead of reading.

use serde::Serialize;

use super::print_json;
use crate::library::Library;
use crate::model::{Artist, PublicAlbum, PublicTrack};

/// An artist together with the albums indexed under it.
#[derive(Serialize)]
struct ArtistView<'a> {
    id: &'a str,
    name: &'a str,
    albums: Vec<PublicAlbum>,
}

impl<'a> ArtistView<'a> {
    fn new(artist: &'a Artist, albums: Vec<PublicAlbum>) -> Self {
        Self {
            id: &artist.id,
            name: &artist.name,
            albums,
        }
    }
}

/// List all albums, ordered by name.
pub fn cmd_albums(library: &Library) -> anyhow::Result<()> {
    let albums: Vec<PublicAlbum> = library
        .index()
        .get_albums()?
        .iter()
        .map(|album| album.public())
        .collect();
    print_json(&albums)
}

/// Show one album and its tracks in track-number order.
pub fn cmd_album(library: &Library, id: &str) -> anyhow::Result<()> {
    let album = library.index().get_album(id)?;
    print_json(&album.public())
}

/// List all artists, ordered by name.
pub fn cmd_artists(library: &Library) -> anyhow::Result<()> {
    print_json(&library.index().get_artists()?)
}

pub fn cmd_artist(library: &Library, id: &str) -> anyhow::Result<()> {
    let index = library.index();
    let artist = index.get_artist(id)?;
    let albums = index
        .get_artist_albums(id)?
        .iter()
        .map(|album| album.public())
        .collect();
    print_json(&ArtistView::new(&artist, albums))
}

pub fn cmd_track(library: &Library, id: &str) -> anyhow::Result<()> {
    let track: PublicTrack = library.index().get_track(id)?.public();
    print_json(&track)
}
