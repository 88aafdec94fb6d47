//! Per-territory caps granted through permission strings of the form
//! `<gamemode>.island.limit.<subject>.<number>`.

use crate::entity::EntityKind;
use crate::error::{PermissionError, UnknownSubject};
use crate::host::Territory;
use crate::limits::Limits;
use crate::material::Material;
use crate::resolve::Subject;
use crate::settings::Settings;
use crate::store::RecordStore;

/// Parses one permission. `Ok(None)` means it belongs to another game mode or
/// is not a limit permission at all.
pub fn parse_grant(settings: &Settings, game_mode: &str, perm: &str) -> Result<Option<(Subject, i32)>, PermissionError> {
    let parts: Vec<&str> = perm.split('.').collect();
    let [mode, "island", "limit", rest @ ..] = parts.as_slice() else {
        return Ok(None);
    };
    if !mode.eq_ignore_ascii_case(game_mode) {
        return Ok(None);
    }
    let [subject, number] = rest else {
        return Err(PermissionError::Malformed(perm.to_owned()));
    };
    if *subject == "*" || *number == "*" {
        return Err(PermissionError::Wildcard(perm.to_owned()));
    }
    let cap: i32 = number
        .parse()
        .ok()
        .filter(|n| *n >= 0)
        .ok_or_else(|| PermissionError::Malformed(perm.to_owned()))?;
    let subject = Material::from_name(subject)
        .map(Subject::Block)
        .or_else(|_| EntityKind::from_name(subject).map(Subject::Entity))
        .or_else(|_| {
            settings
                .group(subject)
                .map(|g| Subject::Group(g.name.clone()))
                .ok_or_else(|| UnknownSubject::subject(subject))
        })
        .map_err(|source| PermissionError::Unknown { perm: perm.to_owned(), source })?;
    Ok(Some((subject, cap)))
}

impl<S: RecordStore> Limits<S> {
    /// Records every limit the owner's permissions grant. A cap only ever
    /// rises this way. Rejected permissions are logged and returned.
    pub fn apply_permissions<'p>(
        &mut self,
        territory: &Territory,
        perms: impl IntoIterator<Item = &'p str>,
    ) -> Vec<PermissionError> {
        let mut errors = vec![];
        let mut granted = 0;
        for perm in perms {
            match parse_grant(&self.settings, &territory.game_mode, perm) {
                Ok(Some((subject, cap))) => {
                    self.records
                        .get_or_create(&territory.id, &territory.game_mode)
                        .grant(&subject, cap);
                    granted += 1;
                }
                Ok(None) => {}
                Err(err) => {
                    log::warn!("{}: {err}", territory.id);
                    errors.push(err);
                }
            }
        }
        if granted > 0 {
            self.records.save(&territory.id);
        }
        errors
    }
}
