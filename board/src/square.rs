use core::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// An index on the board
///
/// Stored in 0x88 method:
/// ```text
/// 0b12345678
///        +-+ File
///    +-+ Rank
///   +   + Must be zero, invalid position if 1
/// ```
///
/// Rank 0 is white's back rank (written "1") and file 0 is the a-file. Stepping off the edge of
/// the board sets one of the guard bits, so offsets can be applied blindly and checked after.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoardSquare(pub u8);
impl BoardSquare {
    /// An invalid square
    ///
    /// Please use this instead of making your own so it's obvious if a deliberately-invalid square
    /// appeared.
    pub const INVALID: Self = Self(0xee);

    pub const A1: Self = Self(0x00);
    pub const B1: Self = Self(0x01);
    pub const C1: Self = Self(0x02);
    pub const D1: Self = Self(0x03);
    pub const E1: Self = Self(0x04);
    pub const F1: Self = Self(0x05);
    pub const G1: Self = Self(0x06);
    pub const H1: Self = Self(0x07);
    pub const A2: Self = Self(0x10);
    pub const B2: Self = Self(0x11);
    pub const C2: Self = Self(0x12);
    pub const D2: Self = Self(0x13);
    pub const E2: Self = Self(0x14);
    pub const F2: Self = Self(0x15);
    pub const G2: Self = Self(0x16);
    pub const H2: Self = Self(0x17);
    pub const A3: Self = Self(0x20);
    pub const B3: Self = Self(0x21);
    pub const C3: Self = Self(0x22);
    pub const D3: Self = Self(0x23);
    pub const E3: Self = Self(0x24);
    pub const F3: Self = Self(0x25);
    pub const G3: Self = Self(0x26);
    pub const H3: Self = Self(0x27);
    pub const A4: Self = Self(0x30);
    pub const B4: Self = Self(0x31);
    pub const C4: Self = Self(0x32);
    pub const D4: Self = Self(0x33);
    pub const E4: Self = Self(0x34);
    pub const F4: Self = Self(0x35);
    pub const G4: Self = Self(0x36);
    pub const H4: Self = Self(0x37);
    pub const A5: Self = Self(0x40);
    pub const B5: Self = Self(0x41);
    pub const C5: Self = Self(0x42);
    pub const D5: Self = Self(0x43);
    pub const E5: Self = Self(0x44);
    pub const F5: Self = Self(0x45);
    pub const G5: Self = Self(0x46);
    pub const H5: Self = Self(0x47);
    pub const A6: Self = Self(0x50);
    pub const B6: Self = Self(0x51);
    pub const C6: Self = Self(0x52);
    pub const D6: Self = Self(0x53);
    pub const E6: Self = Self(0x54);
    pub const F6: Self = Self(0x55);
    pub const G6: Self = Self(0x56);
    pub const H6: Self = Self(0x57);
    pub const A7: Self = Self(0x60);
    pub const B7: Self = Self(0x61);
    pub const C7: Self = Self(0x62);
    pub const D7: Self = Self(0x63);
    pub const E7: Self = Self(0x64);
    pub const F7: Self = Self(0x65);
    pub const G7: Self = Self(0x66);
    pub const H7: Self = Self(0x67);
    pub const A8: Self = Self(0x70);
    pub const B8: Self = Self(0x71);
    pub const C8: Self = Self(0x72);
    pub const D8: Self = Self(0x73);
    pub const E8: Self = Self(0x74);
    pub const F8: Self = Self(0x75);
    pub const G8: Self = Self(0x76);
    pub const H8: Self = Self(0x77);

    /// Names of the valid squares, indexed by `rank * 8 + file`
    const NAMES: [&'static str; 64] = [
        "a1", "b1", "c1", "d1", "e1", "f1", "g1", "h1", //
        "a2", "b2", "c2", "d2", "e2", "f2", "g2", "h2", //
        "a3", "b3", "c3", "d3", "e3", "f3", "g3", "h3", //
        "a4", "b4", "c4", "d4", "e4", "f4", "g4", "h4", //
        "a5", "b5", "c5", "d5", "e5", "f5", "g5", "h5", //
        "a6", "b6", "c6", "d6", "e6", "f6", "g6", "h6", //
        "a7", "b7", "c7", "d7", "e7", "f7", "g7", "h7", //
        "a8", "b8", "c8", "d8", "e8", "f8", "g8", "h8", //
    ];

    /// Returns if this square is valid
    ///
    /// ```
    /// # use board::BoardSquare;
    /// assert!(!BoardSquare::INVALID.is_valid());
    /// assert!(BoardSquare::H8.is_valid());
    /// ```
    pub const fn is_valid(self) -> bool {
        self.0 & 0x88 == 0
    }

    /// Converts self to a valid string, if legal
    pub const fn as_str_legal(self) -> Option<&'static str> {
        match self.to_rank_file() {
            Some((rank, file)) => Some(Self::NAMES[(rank * 8 + file) as usize]),
            None => None,
        }
    }

    /// Converts self to the string name for this position, or `"XX"` if illegal
    pub const fn as_str(self) -> &'static str {
        match self.as_str_legal() {
            Some(s) => s,
            None => "XX",
        }
    }

    /// Produce a board square from the rank and file, returning [`Self::INVALID`] if the rank and
    /// file are not a valid square.
    pub const fn from_rank_file(rank: u8, file: u8) -> Self {
        if rank < 8 && file < 8 {
            Self(rank << 4 | file)
        } else {
            Self::INVALID
        }
    }

    /// Returns the `(rank, file)` tuple if this position is valid
    pub const fn to_rank_file(self) -> Option<(u8, u8)> {
        if self.is_valid() {
            Some((self.0 >> 4, self.0 & 0x07))
        } else {
            None
        }
    }

    /// The rank of this square, meaningless for an invalid square
    pub const fn rank(self) -> u8 {
        (self.0 >> 4) & 0x07
    }

    /// The file of this square, meaningless for an invalid square
    pub const fn file(self) -> u8 {
        self.0 & 0x07
    }

    /// Offset the given number of ranks and files.
    ///
    /// Positive rank moves towards black's side of the board, while positive file moves towards
    /// the h-file.
    ///
    /// ```rust
    /// use board::BoardSquare;
    /// assert_eq!(BoardSquare::D2, BoardSquare::A1.offset(1, 3));
    /// assert_eq!(BoardSquare::A1, BoardSquare::D2.offset(-1, -3));
    /// assert_eq!(BoardSquare::F7, BoardSquare::F7.offset(0, 0));
    /// assert!(!BoardSquare::D1.offset(-1, 0).is_valid());
    /// assert!(!BoardSquare::D8.offset(1, 0).is_valid());
    /// assert!(!BoardSquare::A4.offset(0, -1).is_valid());
    /// assert!(!BoardSquare::H4.offset(0, 1).is_valid());
    /// ```
    pub const fn offset(self, rank: i8, file: i8) -> Self {
        BoardSquareOffset::from_rank_file(rank, file).offset(self)
    }

    /// An iterator over all valid squares on the board, rank by rank from a1
    ///
    /// ```
    /// assert_eq!(board::BoardSquare::all_squares().count(), 64);
    /// ```
    pub fn all_squares() -> impl Iterator<Item = Self> {
        (0..64u8).map(|idx| Self::from_rank_file(idx >> 3, idx & 0x07))
    }

    /// Gets the offset which takes this square to `target`
    ///
    /// If either input is invalid, the result is [`BoardSquareOffset::INVALID`].
    ///
    /// ```
    /// use board::BoardSquare;
    /// let offset = BoardSquare::E2.offset_to(BoardSquare::G5);
    /// assert_eq!((offset.rank(), offset.file()), (3, 2));
    /// ```
    pub const fn offset_to(self, target: Self) -> BoardSquareOffset {
        let (Some((self_rank, self_file)), Some((target_rank, target_file))) =
            (self.to_rank_file(), target.to_rank_file())
        else {
            return BoardSquareOffset::INVALID;
        };
        BoardSquareOffset::from_rank_file(
            target_rank as i8 - self_rank as i8,
            target_file as i8 - self_file as i8,
        )
    }
}
impl fmt::Debug for BoardSquare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardSquare")
            .field("repr", &format_args!("{:X}", self.0))
            .field("readable", &self.as_str_legal().unwrap_or("illegal"))
            .finish()
    }
}
impl fmt::Display for BoardSquare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("board position string was invalid: {0:?}")]
pub struct BoardSquareFromStrErr(pub String);

impl FromStr for BoardSquare {
    type Err = BoardSquareFromStrErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes() {
            &[file @ b'a'..=b'h', rank @ b'1'..=b'8'] => {
                Ok(Self::from_rank_file(rank - b'1', file - b'a'))
            }
            _ => Err(BoardSquareFromStrErr(s.to_owned())),
        }
    }
}

impl Serialize for BoardSquare {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_str_legal() {
            Some(name) => serializer.serialize_str(name),
            None => Err(serde::ser::Error::custom("cannot serialize an invalid square")),
        }
    }
}

impl<'de> Deserialize<'de> for BoardSquare {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(de::Error::custom)
    }
}

/// An offset on a board
///
/// This struct stores any possible offset in both rank and file between any two squares, using
/// only one byte of space.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BoardSquareOffset(u8);
impl BoardSquareOffset {
    /// The offsets corresponding to all possible knight moves
    pub const KNIGHT_MOVES: [BoardSquareOffset; 8] = [
        Self::from_rank_file(2, 1),
        Self::from_rank_file(2, -1),
        Self::from_rank_file(-2, 1),
        Self::from_rank_file(-2, -1),
        Self::from_rank_file(1, 2),
        Self::from_rank_file(1, -2),
        Self::from_rank_file(-1, 2),
        Self::from_rank_file(-1, -2),
    ];

    /// The offsets corresponding to all possible king steps
    pub const KING_MOVES: [BoardSquareOffset; 8] = [
        Self::from_rank_file(1, 1),
        Self::from_rank_file(1, 0),
        Self::from_rank_file(1, -1),
        Self::from_rank_file(0, 1),
        Self::from_rank_file(0, -1),
        Self::from_rank_file(-1, 1),
        Self::from_rank_file(-1, 0),
        Self::from_rank_file(-1, -1),
    ];

    /// This is an invalid offset that, when applied to any [`BoardSquare`], invalidates it.
    pub const INVALID: Self = Self(0x88);

    /// Produce a new offset from the given rank and file amounts
    ///
    /// In debug mode, we assert that the rank and file are both on the interval [-7,7] (which are
    /// the only possible offsets). In release mode, we wrap modulo 16 and allow for -8, which
    /// invalidates any square.
    pub const fn from_rank_file(rank: i8, file: i8) -> Self {
        debug_assert!(-8 < rank && rank < 8);
        debug_assert!(-8 < file && file < 8);
        Self(((rank as u8) << 4) & 0xF0 | (file as u8) & 0x0F)
    }

    /// Offset the given board square
    ///
    /// If the square is already invalid, then the same square is returned unchanged.
    pub const fn offset(self, square: BoardSquare) -> BoardSquare {
        if square.is_valid() {
            BoardSquare(((self.0 & 0x77) + square.0) ^ (self.0 & 0x88))
        } else {
            square
        }
    }

    /// Gets the signed number of files associated with this offset
    pub const fn file(self) -> i8 {
        (self.0 as i8) << 4 >> 4
    }

    /// Gets the signed number of ranks associated with this offset
    pub const fn rank(self) -> i8 {
        (self.0 as i8) >> 4
    }

    /// The offset of one step in the same direction, where each component is -1, 0 or 1
    pub const fn unit(self) -> Self {
        Self::from_rank_file(self.rank().signum(), self.file().signum())
    }

    /// Whether this offset lies along a rank or a file
    pub const fn is_straight(self) -> bool {
        (self.rank() == 0) != (self.file() == 0)
    }

    /// Whether this offset lies along a diagonal
    pub const fn is_diagonal(self) -> bool {
        self.rank() != 0 && self.rank().unsigned_abs() == self.file().unsigned_abs()
    }
}
impl fmt::Debug for BoardSquareOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardSquareOffset")
            .field("rank", &self.rank())
            .field("file", &self.file())
            .finish()
    }
}
