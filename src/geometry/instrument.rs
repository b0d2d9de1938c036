use crate::ephemeris::Ephemeris;
use crate::label::InstrumentIdentity;
use crate::mission::InstrumentTables;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInstrument {
    pub frame: String,
    pub id: i32,
}

type Strategy<E> = fn(&InstrumentIdentity, &InstrumentTables, &E) -> Option<ResolvedInstrument>;

/// Resolution order; the first strategy that yields an instrument wins.
fn strategies<E: Ephemeris>() -> [Strategy<E>; 4] {
    [
        by_frame_name::<E>,
        by_number::<E>,
        by_code::<E>,
        by_category::<E>,
    ]
}

pub fn resolve<E: Ephemeris>(
    identity: &InstrumentIdentity,
    tables: &InstrumentTables,
    ephemeris: &E,
) -> Option<ResolvedInstrument> {
    strategies::<E>()
        .iter()
        .find_map(|strategy| strategy(identity, tables, ephemeris))
}

fn lookup<E: Ephemeris>(frame: &str, ephemeris: &E) -> Option<ResolvedInstrument> {
    let frame = frame.trim();
    let id = ephemeris.frame_name_to_id(frame).ok()?;
    Some(ResolvedInstrument {
        frame: frame.to_string(),
        id,
    })
}

fn by_frame_name<E: Ephemeris>(
    identity: &InstrumentIdentity,
    _: &InstrumentTables,
    ephemeris: &E,
) -> Option<ResolvedInstrument> {
    lookup(identity.frame_name.as_deref()?, ephemeris)
}

fn by_number<E: Ephemeris>(
    identity: &InstrumentIdentity,
    _: &InstrumentTables,
    ephemeris: &E,
) -> Option<ResolvedInstrument> {
    let id = identity.number?;
    // An id with a field of view but no registered name still resolves.
    let frame = match ephemeris.frame_id_to_name(id) {
        Ok(name) => name,
        Err(_) => ephemeris.field_of_view(id).ok()?.frame,
    };
    Some(ResolvedInstrument { frame, id })
}

fn by_code<E: Ephemeris>(
    identity: &InstrumentIdentity,
    tables: &InstrumentTables,
    ephemeris: &E,
) -> Option<ResolvedInstrument> {
    lookup(tables.frame_for_code(identity.code.as_deref()?)?, ephemeris)
}

fn by_category<E: Ephemeris>(
    identity: &InstrumentIdentity,
    tables: &InstrumentTables,
    ephemeris: &E,
) -> Option<ResolvedInstrument> {
    lookup(tables.frame_for_category(identity.category?)?, ephemeris)
}

/// Short description of an identity for error messages.
pub fn describe(identity: &InstrumentIdentity) -> String {
    let mut parts = Vec::new();
    if let Some(frame) = &identity.frame_name {
        parts.push(format!("frame={}", frame));
    }
    if let Some(number) = identity.number {
        parts.push(format!("id={}", number));
    }
    if let Some(code) = &identity.code {
        parts.push(format!("code={}", code));
    }
    if let Some(category) = identity.category {
        parts.push(format!("category={}", category));
    }
    parts.join(" ")
}
