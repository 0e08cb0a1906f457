use tempo_core::*;

/// One side's board summary, the 15-feature row the scorer weighs and the
/// encoder stacks into board and history tensors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Hero health plus armor.
    pub health: Feature,
    pub base_mana: Feature,
    pub remaining_mana: Feature,
    pub hand_size: Feature,
    pub board_size: Feature,
    pub deck_size: Feature,
    pub secret_size: Feature,
    pub graveyard_size: Feature,
    /// Sum of attack over board minions.
    pub total_attack: Feature,
    /// Sum of health over board minions.
    pub total_health: Feature,
    /// Sum of health over taunt minions.
    pub taunt_health: Feature,
    pub hero_attack: Feature,
    pub weapon_durability: Feature,
    pub power_uses: Feature,
    /// Sum of mana costs over hand cards.
    pub hand_cost: Feature,
}

impl Summary {
    pub fn vector(&self) -> [Feature; BOARD_FEATURES] {
        [
            self.health,
            self.base_mana,
            self.remaining_mana,
            self.hand_size,
            self.board_size,
            self.deck_size,
            self.secret_size,
            self.graveyard_size,
            self.total_attack,
            self.total_health,
            self.taunt_health,
            self.hero_attack,
            self.weapon_durability,
            self.power_uses,
            self.hand_cost,
        ]
    }
}

/// One board minion: numeric stats followed by ability flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Minion {
    pub attack: Feature,
    pub health: Feature,
    pub can_attack: bool,
    pub deathrattle: bool,
    pub divine_shield: bool,
    pub elusive: bool,
    pub frozen: bool,
    pub inspire: bool,
    pub lifesteal: bool,
    pub poisonous: bool,
    pub spell_power: Feature,
    pub stealth: bool,
    pub taunt: bool,
    pub windfury: bool,
}

impl Minion {
    pub fn vector(&self) -> [Feature; MINION_FEATURES] {
        [
            self.attack,
            self.health,
            self.can_attack as Feature,
            self.deathrattle as Feature,
            self.divine_shield as Feature,
            self.elusive as Feature,
            self.frozen as Feature,
            self.inspire as Feature,
            self.lifesteal as Feature,
            self.poisonous as Feature,
            self.spell_power,
            self.stealth as Feature,
            self.taunt as Feature,
            self.windfury as Feature,
        ]
    }
}

/// Card category one-hot in the leading slots of the card vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    Minion,
    Spell,
    Weapon,
    Hero,
}

/// One hand card, summarized down to kind, cost, stats, and coarse
/// counts of its text effects. The engine is responsible for deriving
/// the counts; the encoder only lays them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardInfo {
    pub kind: CardKind,
    pub cost: Feature,
    pub attack: Feature,
    pub defense: Feature,
    /// Cards drawn when played.
    pub draw: Feature,
    /// Damage dealt when played.
    pub damage: Feature,
    /// Health restored when played.
    pub restore: Feature,
    /// Whether the effect hits all targets.
    pub aoe: Feature,
    /// Count of one-shot effects (battlecry, charge, rush, ...).
    pub instant_effects: Feature,
    /// Count of continuous triggers (start/end of turn, whenever, ...).
    pub triggers: Feature,
    /// Count of static enchantments (taunt, stealth, poisonous, ...).
    pub enchantments: Feature,
}

impl CardInfo {
    pub fn vector(&self) -> [Feature; CARD_FEATURES] {
        let kind = |k: CardKind| (self.kind == k) as Feature;
        [
            kind(CardKind::Minion),
            kind(CardKind::Spell),
            kind(CardKind::Weapon),
            kind(CardKind::Hero),
            self.cost,
            self.attack,
            self.defense,
            self.draw,
            self.damage,
            self.restore,
            self.aoe,
            self.instant_effects,
            self.triggers,
            self.enchantments,
        ]
    }
}
