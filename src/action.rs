//! Action encoding (spec §4.2). The controller's only output is one `u8` per
//! agent per tick; the environment decodes and applies it.

/// Number of distinct argument slots a verb can carry (direction index,
/// build index, or target parameter share the same arg space).
pub const ACTION_ARGUMENT_COUNT: u8 = 32;

/// The verbs an option's `act` can emit. `Noop` is the universal "no
/// action" sentinel that `run_options` treats as "this option couldn't act".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Verb {
    Noop = 0,
    Move = 1,
    Attack = 2,
    Use = 3,
    Swap = 4,
    Put = 5,
    PlantLantern = 6,
    PlantResource = 7,
    Build = 8,
    Orient = 9,
    SetRallyPoint = 10,
}

impl Verb {
    const ALL: [Verb; 11] = [
        Verb::Noop,
        Verb::Move,
        Verb::Attack,
        Verb::Use,
        Verb::Swap,
        Verb::Put,
        Verb::PlantLantern,
        Verb::PlantResource,
        Verb::Build,
        Verb::Orient,
        Verb::SetRallyPoint,
    ];

    const fn from_u8(value: u8) -> Option<Verb> {
        Some(match value {
            0 => Verb::Noop,
            1 => Verb::Move,
            2 => Verb::Attack,
            3 => Verb::Use,
            4 => Verb::Swap,
            5 => Verb::Put,
            6 => Verb::PlantLantern,
            7 => Verb::PlantResource,
            8 => Verb::Build,
            9 => Verb::Orient,
            10 => Verb::SetRallyPoint,
            _ => return None,
        })
    }
}

/// An encoded `(verb, arg)` pair, as produced by an option's `act` and
/// consumed by the environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Action {
    pub verb: Verb,
    pub arg: u8,
}

impl Action {
    pub const NOOP: Action = Action { verb: Verb::Noop, arg: 0 };

    pub const fn new(verb: Verb, arg: u8) -> Self {
        Self { verb, arg }
    }

    pub const fn is_noop(self) -> bool {
        matches!(self.verb, Verb::Noop)
    }

    /// `action = verb * ActionArgumentCount + arg`.
    pub fn encode(self) -> u8 {
        let verb = self.verb as u32;
        let arg = self.arg as u32 % ACTION_ARGUMENT_COUNT as u32;
        (verb * ACTION_ARGUMENT_COUNT as u32 + arg) as u8
    }

    pub fn decode(encoded: u8) -> Option<Action> {
        let verb_index = encoded / ACTION_ARGUMENT_COUNT;
        let arg = encoded % ACTION_ARGUMENT_COUNT;
        Verb::from_u8(verb_index).map(|verb| Action::new(verb, arg))
    }
}
