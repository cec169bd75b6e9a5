//! Dynamic game entities as reported by the game-state monitor.
//!
//! These are plain records; the renderer reads them and never mutates them.

use crate::point::{Direction, Point};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nation {
    Romans,
    Africans,
    Japanese,
    Vikings,
}

impl Nation {
    pub const ALL: [Nation; 4] = [
        Nation::Romans,
        Nation::Africans,
        Nation::Japanese,
        Nation::Vikings,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerColor {
    Blue,
    Yellow,
    Red,
    Purple,
    Gray,
    Green,
    Brown,
    White,
}

impl PlayerColor {
    pub const ALL: [PlayerColor; 8] = [
        PlayerColor::Blue,
        PlayerColor::Yellow,
        PlayerColor::Red,
        PlayerColor::Purple,
        PlayerColor::Gray,
        PlayerColor::Green,
        PlayerColor::Brown,
        PlayerColor::White,
    ];
}

/// Where a unit is: standing at a point, or walking between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Position {
    At { point: Point, direction: Direction },
    Moving(Movement),
}

/// Progress of a unit travelling from `previous` to `next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub previous: Point,
    pub next: Point,
    /// 0..=100
    pub percentage_traveled: u8,
}

impl Movement {
    /// Fraction of the way travelled, clamped to `0.0..=1.0`.
    pub fn fraction(&self) -> f32 {
        f32::from(self.percentage_traveled.min(100)) / 100.0
    }

    pub fn direction(&self) -> Direction {
        Direction::between(self.previous, self.next)
    }
}

impl Position {
    /// The grid point the unit is anchored to for culling purposes.
    pub fn anchor(&self) -> Point {
        match self {
            Position::At { point, .. } => *point,
            Position::Moving(m) => m.previous,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseType {
    Woodcutter,
    Forester,
    Quarry,
    Fishery,
    HunterHut,
    Sawmill,
    Farm,
    Mill,
    Bakery,
    Well,
    Brewery,
    SlaughterHouse,
    PigFarm,
    DonkeyFarm,
    IronSmelter,
    Mint,
    Armory,
    Metalworks,
    GoldMine,
    IronMine,
    CoalMine,
    GraniteMine,
    Barracks,
    GuardHouse,
    WatchTower,
    Fortress,
    Headquarter,
    Storehouse,
    Harbor,
    Shipyard,
    LookoutTower,
    Catapult,
}

impl HouseType {
    /// Human-readable name used for the house title overlay.
    pub fn title(self) -> &'static str {
        use HouseType::*;
        match self {
            Woodcutter => "Woodcutter",
            Forester => "Forester",
            Quarry => "Quarry",
            Fishery => "Fishery",
            HunterHut => "Hunter",
            Sawmill => "Sawmill",
            Farm => "Farm",
            Mill => "Mill",
            Bakery => "Bakery",
            Well => "Well",
            Brewery => "Brewery",
            SlaughterHouse => "Slaughter house",
            PigFarm => "Pig farm",
            DonkeyFarm => "Donkey farm",
            IronSmelter => "Iron smelter",
            Mint => "Mint",
            Armory => "Armory",
            Metalworks => "Metalworks",
            GoldMine => "Gold mine",
            IronMine => "Iron mine",
            CoalMine => "Coal mine",
            GraniteMine => "Granite mine",
            Barracks => "Barracks",
            GuardHouse => "Guard house",
            WatchTower => "Watch tower",
            Fortress => "Fortress",
            Headquarter => "Headquarter",
            Storehouse => "Storehouse",
            Harbor => "Harbor",
            Shipyard => "Shipyard",
            LookoutTower => "Lookout tower",
            Catapult => "Catapult",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseState {
    Planned,
    UnderConstruction,
    Ready,
    Occupied,
    Burning,
    Destroyed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct House {
    pub id: u32,
    pub point: Point,
    pub house_type: HouseType,
    pub nation: Nation,
    pub state: HouseState,
    /// Construction progress 0..=100, meaningful while under construction.
    #[serde(default)]
    pub construction_progress: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeType {
    Pine,
    Birch,
    Oak,
    PalmOne,
    PalmTwo,
    Pineapple,
    Cypress,
    Cherry,
    Fir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeSize {
    NewlyPlanted,
    Small,
    Medium,
    FullGrown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub point: Point,
    pub tree_type: TreeType,
    pub size: TreeSize,
}

/// A tree being felled; `started_at` is the animation index when it began falling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallingTree {
    pub point: Point,
    pub tree_type: TreeType,
    pub started_at: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropType {
    Wheat,
    Flax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropGrowth {
    JustPlanted,
    SmallGrowth,
    AlmostGrown,
    FullGrown,
    Harvested,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub point: Point,
    pub crop_type: CropType,
    pub growth: CropGrowth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignKind {
    Gold,
    Iron,
    Coal,
    Stone,
    Water,
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignSize {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sign {
    pub point: Point,
    pub sign: SignKind,
    pub size: SignSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoneType {
    Stone1,
    Stone2,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stone {
    pub point: Point,
    pub stone_type: StoneType,
    /// Remaining stone, 1..=6.
    pub amount: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimalKind {
    Rabbit,
    Fox,
    Stag,
    Deer,
    Duck,
    Sheep,
    Deer2,
    Duck2,
    Pack,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: u32,
    pub animal: AnimalKind,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipStage {
    UnderConstruction,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub id: u32,
    pub position: Position,
    pub stage: ShipStage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerType {
    Courier,
    Donkey,
    Builder,
    Planer,
    Woodcutter,
    Forester,
    Stonemason,
    Fisherman,
    Hunter,
    Sawmiller,
    Farmer,
    Miller,
    Baker,
    Brewer,
    Butcher,
    PigBreeder,
    DonkeyBreeder,
    IronFounder,
    Minter,
    Armorer,
    Metalworker,
    Miner,
    Geologist,
    Scout,
    Shipwright,
    Private,
    PrivateFirstClass,
    Sergeant,
    Officer,
    General,
}

/// A discrete action with its own frame sequence (chopping, hammering, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CuttingTree,
    PlantingTree,
    HammeringHouse,
    DiggingGround,
    CuttingStone,
    Fishing,
    Shooting,
    Sowing,
    Harvesting,
    InvestigatingSite,
    Hit,
    Jump,
    Die,
    Cheer,
}

/// An action in progress; `started_at` is the animation index when it began.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerActivity {
    pub action: ActionKind,
    pub started_at: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    Wood,
    Plank,
    Stone,
    Water,
    Wheat,
    Flour,
    Bread,
    Fish,
    Meat,
    Pig,
    Beer,
    IronBar,
    Iron,
    Coal,
    Gold,
    Coin,
    Sword,
    Shield,
    Tongs,
    Hammer,
    Axe,
    Saw,
    Pick,
    Shovel,
    Crucible,
    FishingRod,
    Scythe,
    Cleaver,
    RollingPin,
    Bow,
    Boat,
    Donkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: u32,
    pub worker_type: WorkerType,
    pub nation: Nation,
    pub color: PlayerColor,
    pub position: Position,
    #[serde(default)]
    pub action: Option<WorkerActivity>,
    #[serde(default)]
    pub cargo: Option<Material>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub id: u32,
    pub point: Point,
    pub nation: Nation,
    pub color: PlayerColor,
    /// Cargo waiting at the flag, oldest first.
    #[serde(default)]
    pub stacked_cargo: Vec<Material>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadKind {
    Normal,
    Main,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Road {
    pub id: u32,
    pub points: Vec<Point>,
    #[serde(default = "default_road_kind")]
    pub kind: RoadKind,
}

fn default_road_kind() -> RoadKind {
    RoadKind::Normal
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecorationKind {
    BrownMushroom,
    MiniBrownMushroom,
    RedMushroom,
    MiniStone,
    FewSmallStones,
    Bush,
    MiniBush,
    Flowers,
    Grass,
    SmallGrass,
    Cactus,
    Skeleton,
    Fallen,
    PortionOfPebbles,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderSegment {
    pub nation: Nation,
    pub color: PlayerColor,
    pub points: Vec<Point>,
}

/// What the player could build at a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailableConstruction {
    Flag,
    Small,
    Medium,
    Large,
    Mine,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_fraction_clamps() {
        let m = Movement {
            previous: Point::new(0, 0),
            next: Point::new(2, 0),
            percentage_traveled: 250,
        };
        assert_eq!(m.fraction(), 1.0);
        assert_eq!(m.direction(), Direction::East);
    }

    #[test]
    fn test_position_deserializes_tagged() {
        let json = r#"{"kind":"moving","previous":{"x":0,"y":0},"next":{"x":1,"y":1},"percentage_traveled":40}"#;
        let pos: Position = serde_json::from_str(json).unwrap();
        assert_eq!(pos.anchor(), Point::new(0, 0));
        match pos {
            Position::Moving(m) => assert_eq!(m.direction(), Direction::NorthEast),
            other => panic!("expected moving, got {:?}", other),
        }
    }
}
