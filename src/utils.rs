/// RGB format for colours
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Colour {
    r: u8,
    g: u8,
    b: u8,
}

impl Default for Colour {
    fn default() -> Self {
        // The default is the black colour
        DefinedColours::Black.colour()
    }
}

impl Colour {
    /// A grey level, used by the depth visualization (0 is black, 255 white)
    pub fn grey(level: u8) -> Colour {
        Self {
            r: level,
            g: level,
            b: level,
        }
    }

    /// A random opaque colour, one per face in the colour render
    pub fn random() -> Colour {
        Self {
            r: rand::random_range(0..=255),
            g: rand::random_range(0..=255),
            b: rand::random_range(0..=255),
        }
    }

    pub fn to_array(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<Colour> for [u8; 3] {
    fn from(value: Colour) -> Self {
        value.to_array()
    }
}

impl From<(u8, u8, u8)> for Colour {
    fn from(value: (u8, u8, u8)) -> Self {
        Self {
            r: value.0,
            g: value.1,
            b: value.2,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum DefinedColours {
    #[allow(dead_code)]
    White,
    Black,
}

impl DefinedColours {
    /// Fetches the [`Colour`] struct value of that DefinedColour
    pub fn colour(&self) -> Colour {
        match self {
            DefinedColours::White => Colour::from((255, 255, 255)),
            DefinedColours::Black => Colour::from((0, 0, 0)),
        }
    }
}
