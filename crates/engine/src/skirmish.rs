use super::*;
use rand::Rng;
use rand::seq::SliceRandom;
use tempo_core::*;

const HERO_HEALTH: Feature = 30;
const MANA_CAP: Feature = 10;

/// A card in the skirmish toy game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Card {
    /// A minion with fixed stats.
    Recruit {
        cost: Feature,
        attack: Feature,
        health: Feature,
        taunt: bool,
    },
    /// Targeted damage spell.
    Bolt { cost: Feature, damage: Feature },
    /// Heal your own hero.
    Tonic { cost: Feature, restore: Feature },
    /// Random damage (1-3) to a random enemy. The one stochastic card,
    /// there to exercise chance-node search paths.
    Gamble { cost: Feature },
}

impl Card {
    pub fn cost(&self) -> Feature {
        match *self {
            Card::Recruit { cost, .. }
            | Card::Bolt { cost, .. }
            | Card::Tonic { cost, .. }
            | Card::Gamble { cost } => cost,
        }
    }
    pub fn info(&self) -> CardInfo {
        let zero = CardInfo {
            kind: CardKind::Spell,
            cost: self.cost(),
            attack: 0,
            defense: 0,
            draw: 0,
            damage: 0,
            restore: 0,
            aoe: 0,
            instant_effects: 0,
            triggers: 0,
            enchantments: 0,
        };
        match *self {
            Card::Recruit {
                attack,
                health,
                taunt,
                ..
            } => CardInfo {
                kind: CardKind::Minion,
                attack,
                defense: health,
                enchantments: taunt as Feature,
                ..zero
            },
            Card::Bolt { damage, .. } => CardInfo { damage, ..zero },
            Card::Tonic { restore, .. } => CardInfo { restore, ..zero },
            Card::Gamble { .. } => CardInfo { damage: 2, ..zero },
        }
    }
}

/// A minion in play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub attack: Feature,
    pub health: Feature,
    pub taunt: bool,
    pub ready: bool,
}

/// What an attack or spell is aimed at, on the enemy side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Hero,
    Minion(usize),
}

/// A legal move in the skirmish game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Play { card: usize, target: Option<Target> },
    Strike { attacker: usize, target: Target },
    EndTurn,
}

impl Action for Move {
    fn ends_turn(&self) -> bool {
        matches!(self, Move::EndTurn)
    }
}

/// One seat's half of the game state.
#[derive(Debug, Clone)]
struct Battler {
    health: Feature,
    base_mana: Feature,
    mana: Feature,
    deck: Vec<Card>,
    hand: Vec<Card>,
    board: Vec<Token>,
    graveyard: Feature,
    fatigue: Feature,
}

impl Battler {
    fn new(deck: Vec<Card>, opening: usize) -> Self {
        let mut battler = Self {
            health: HERO_HEALTH,
            base_mana: 0,
            mana: 0,
            deck,
            hand: Vec::new(),
            board: Vec::new(),
            graveyard: 0,
            fatigue: 0,
        };
        for _ in 0..opening {
            battler.draw();
        }
        battler
    }
    fn draw(&mut self) {
        match self.deck.pop() {
            Some(card) if self.hand.len() < MAX_HAND_CARDS => self.hand.push(card),
            Some(_) => self.graveyard += 1, // overdraw burns the card
            None => {
                self.fatigue += 1;
                self.health -= self.fatigue;
            }
        }
    }
    /// Remove dead minions, crediting the graveyard.
    fn reap(&mut self) {
        let before = self.board.len();
        self.board.retain(|t| t.health > 0);
        self.graveyard += (before - self.board.len()) as Feature;
    }
    fn taunts(&self) -> Vec<usize> {
        self.board
            .iter()
            .enumerate()
            .filter(|(_, t)| t.taunt)
            .map(|(i, _)| i)
            .collect()
    }
}

/// A miniature two-seat minion game used to exercise the search and
/// training stack in-repo. Not a rules engine: just enough mana, combat,
/// and randomness to produce deterministic, stochastic, and terminal
/// transitions.
#[derive(Debug, Clone)]
pub struct Skirmish {
    seats: [Battler; 2],
    turn: Seat,
}

impl Skirmish {
    /// Standard 20-card deck pool, two copies of each shape.
    pub fn standard_deck() -> Vec<Card> {
        let pool = [
            Card::Recruit {
                cost: 1,
                attack: 1,
                health: 2,
                taunt: false,
            },
            Card::Recruit {
                cost: 2,
                attack: 2,
                health: 3,
                taunt: false,
            },
            Card::Recruit {
                cost: 3,
                attack: 3,
                health: 4,
                taunt: true,
            },
            Card::Recruit {
                cost: 4,
                attack: 4,
                health: 5,
                taunt: false,
            },
            Card::Recruit {
                cost: 5,
                attack: 5,
                health: 6,
                taunt: true,
            },
            Card::Bolt { cost: 1, damage: 2 },
            Card::Bolt { cost: 3, damage: 4 },
            Card::Tonic {
                cost: 2,
                restore: 4,
            },
            Card::Gamble { cost: 2 },
            Card::Recruit {
                cost: 2,
                attack: 3,
                health: 2,
                taunt: false,
            },
        ];
        pool.iter().chain(pool.iter()).copied().collect()
    }

    /// A fresh game with shuffled standard decks. The first seat opens
    /// with one fewer card as a crude initiative tax.
    pub fn deal() -> Self {
        let ref mut rng = rand::rng();
        let mut decks = [Self::standard_deck(), Self::standard_deck()];
        decks.iter_mut().for_each(|d| d.shuffle(rng));
        let [one, two] = decks;
        let mut game = Self {
            seats: [Battler::new(one, 3), Battler::new(two, 4)],
            turn: Seat::First,
        };
        // first turn's mana ramp
        game.seats[0].base_mana = 1;
        game.seats[0].mana = 1;
        game
    }

    fn battler(&self, side: Side) -> &Battler {
        let seat = match side {
            Side::Friendly => self.turn,
            Side::Enemy => self.turn.rival(),
        };
        &self.seats[seat.index()]
    }

    fn pair(&mut self) -> (&mut Battler, &mut Battler) {
        let [ref mut first, ref mut second] = self.seats;
        match self.turn {
            Seat::First => (first, second),
            Seat::Second => (second, first),
        }
    }

    /// Targets an enemy attack or spell may aim at, honoring taunt.
    fn strikeable(&self) -> Vec<Target> {
        let foe = self.battler(Side::Enemy);
        let taunts = foe.taunts();
        if taunts.is_empty() {
            std::iter::once(Target::Hero)
                .chain((0..foe.board.len()).map(Target::Minion))
                .collect()
        } else {
            taunts.into_iter().map(Target::Minion).collect()
        }
    }

    fn hit(foe: &mut Battler, target: Target, damage: Feature) -> Option<()> {
        match target {
            Target::Hero => foe.health -= damage,
            Target::Minion(i) => foe.board.get_mut(i)?.health -= damage,
        }
        foe.reap();
        Some(())
    }

    fn apply(&mut self, action: &Move) -> Option<()> {
        match *action {
            Move::Play { card, target } => {
                let (me, _) = self.pair();
                let card = *me.hand.get(card)?;
                if card.cost() > me.mana {
                    return None;
                }
                let (me, foe) = self.pair();
                me.mana -= card.cost();
                me.hand.retain_first(&card);
                match card {
                    Card::Recruit {
                        attack,
                        health,
                        taunt,
                        ..
                    } => {
                        if me.board.len() >= MAX_SIDE_MINIONS {
                            return None;
                        }
                        me.board.push(Token {
                            attack,
                            health,
                            taunt,
                            ready: false,
                        });
                    }
                    Card::Bolt { damage, .. } => Self::hit(foe, target?, damage)?,
                    Card::Tonic { restore, .. } => {
                        me.health = (me.health + restore).min(HERO_HEALTH);
                        me.graveyard += 1;
                    }
                    Card::Gamble { .. } => {
                        let ref mut rng = rand::rng();
                        let damage = rng.random_range(1..=3);
                        let target = match foe.board.len() {
                            0 => Target::Hero,
                            n => match rng.random_range(0..=n) {
                                0 => Target::Hero,
                                i => Target::Minion(i - 1),
                            },
                        };
                        Self::hit(foe, target, damage)?;
                    }
                }
                if matches!(card, Card::Bolt { .. } | Card::Gamble { .. }) {
                    self.pair().0.graveyard += 1;
                }
            }
            Move::Strike { attacker, target } => {
                let (me, foe) = self.pair();
                let token = *me.board.get(attacker)?;
                if !token.ready || token.attack <= 0 {
                    return None;
                }
                me.board.get_mut(attacker)?.ready = false;
                if let Target::Minion(i) = target {
                    let blocker = *foe.board.get(i)?;
                    me.board.get_mut(attacker)?.health -= blocker.attack;
                    me.reap();
                }
                Self::hit(foe, target, token.attack)?;
            }
            Move::EndTurn => {
                self.turn = self.turn.rival();
                let (me, _) = self.pair();
                me.base_mana = (me.base_mana + 1).min(MANA_CAP);
                me.mana = me.base_mana;
                me.board.iter_mut().for_each(|t| t.ready = true);
                me.draw();
            }
        }
        Some(())
    }
}

/// `Vec::retain` keyed to remove only the first matching element.
trait RetainFirst<T: PartialEq> {
    fn retain_first(&mut self, needle: &T);
}
impl<T: PartialEq> RetainFirst<T> for Vec<T> {
    fn retain_first(&mut self, needle: &T) {
        if let Some(i) = self.iter().position(|x| x == needle) {
            self.remove(i);
        }
    }
}

impl State for Skirmish {
    type Action = Move;

    fn options(&self) -> Vec<Move> {
        let me = self.battler(Side::Friendly);
        let foe = self.battler(Side::Enemy);
        let mut moves = Vec::new();
        for (i, card) in me.hand.iter().enumerate() {
            if card.cost() > me.mana {
                continue;
            }
            match card {
                Card::Recruit { .. } if me.board.len() < MAX_SIDE_MINIONS => {
                    moves.push(Move::Play {
                        card: i,
                        target: None,
                    });
                }
                Card::Recruit { .. } => {}
                Card::Bolt { .. } => {
                    moves.extend(
                        std::iter::once(Target::Hero)
                            .chain((0..foe.board.len()).map(Target::Minion))
                            .map(|t| Move::Play {
                                card: i,
                                target: Some(t),
                            }),
                    );
                }
                Card::Tonic { .. } | Card::Gamble { .. } => {
                    moves.push(Move::Play {
                        card: i,
                        target: None,
                    });
                }
            }
        }
        for (i, token) in me.board.iter().enumerate() {
            if token.ready && token.attack > 0 {
                moves.extend(
                    self.strikeable()
                        .into_iter()
                        .map(|t| Move::Strike {
                            attacker: i,
                            target: t,
                        }),
                );
            }
        }
        moves.push(Move::EndTurn);
        moves
    }

    fn simulate(&self, action: &Move) -> Option<Self> {
        let mut next = self.clone();
        next.apply(action)?;
        Some(next)
    }

    fn end_turn(&self) -> Move {
        Move::EndTurn
    }

    fn to_move(&self) -> Seat {
        self.turn
    }

    fn finished(&self) -> Option<Verdict> {
        let dead = [self.seats[0].health <= 0, self.seats[1].health <= 0];
        match dead {
            [true, true] => Some(Verdict::Draw),
            [true, false] => Some(Verdict::Winner(Seat::Second)),
            [false, true] => Some(Verdict::Winner(Seat::First)),
            [false, false] => None,
        }
    }

    fn summary(&self, side: Side) -> Summary {
        let b = self.battler(side);
        Summary {
            health: b.health,
            base_mana: b.base_mana,
            remaining_mana: b.mana,
            hand_size: b.hand.len() as Feature,
            board_size: b.board.len() as Feature,
            deck_size: b.deck.len() as Feature,
            secret_size: 0,
            graveyard_size: b.graveyard,
            total_attack: b.board.iter().map(|t| t.attack).sum(),
            total_health: b.board.iter().map(|t| t.health).sum(),
            taunt_health: b.board.iter().filter(|t| t.taunt).map(|t| t.health).sum(),
            hero_attack: 0,
            weapon_durability: 0,
            power_uses: 0,
            hand_cost: b.hand.iter().map(|c| c.cost()).sum(),
        }
    }

    fn minions(&self, side: Side) -> Vec<Minion> {
        self.battler(side)
            .board
            .iter()
            .map(|t| Minion {
                attack: t.attack,
                health: t.health,
                can_attack: t.ready && t.attack > 0,
                taunt: t.taunt,
                ..Minion::default()
            })
            .collect()
    }

    fn hand(&self, side: Side) -> Vec<CardInfo> {
        match side {
            Side::Friendly => self
                .battler(side)
                .hand
                .iter()
                .map(Card::info)
                .collect(),
            // hidden information
            Side::Enemy => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_option_simulates() {
        let game = Skirmish::deal();
        for action in game.options() {
            assert!(game.simulate(&action).is_some(), "{:?}", action);
        }
    }

    #[test]
    fn end_turn_flips_mover_and_ramps_mana() {
        let game = Skirmish::deal();
        let next = game.simulate(&Move::EndTurn).unwrap();
        assert_eq!(next.to_move(), game.to_move().rival());
        assert_eq!(next.summary(Side::Friendly).base_mana, 1);
    }

    #[test]
    fn dead_hero_finishes_the_game() {
        let mut game = Skirmish::deal();
        game.seats[1].health = 0;
        assert_eq!(game.finished(), Some(Verdict::Winner(Seat::First)));
    }

    #[test]
    fn random_playout_terminates() {
        use rand::seq::IndexedRandom;
        let ref mut rng = rand::rng();
        let mut game = Skirmish::deal();
        for _ in 0..MAX_GAME_PLIES {
            if game.finished().is_some() {
                return;
            }
            let options = game.options();
            let action = options.choose(rng).unwrap();
            game = game.simulate(action).expect("options are legal");
        }
        panic!("game never terminated");
    }

    #[test]
    fn enemy_hand_is_hidden() {
        let game = Skirmish::deal();
        assert!(game.hand(Side::Enemy).is_empty());
        assert!(!game.hand(Side::Friendly).is_empty());
    }
}
