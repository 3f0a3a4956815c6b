//! Effect type ids stored in COMMON byte 0

use serde::{Deserialize, Serialize};

macro_rules! effect_types {
    ($($variant:ident = $id:literal => $name:literal),+ $(,)?) => {
        /// Effect algorithm of a patch
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum EffectType {
            $($variant = $id),+
        }

        impl EffectType {
            /// Every effect type, ordered by id
            pub const ALL: &'static [EffectType] = &[$(EffectType::$variant),+];

            /// Look up an effect type by its id (0x00-0x49)
            pub fn from_id(id: u8) -> Option<Self> {
                match id {
                    $($id => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Display name as shown on the device editor
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }
    };
}

effect_types! {
    AcousticMulti = 0x00 => "Acoustic Multi",
    EightBandParallelDelay = 0x01 => "8 Band Parallel Delay",
    EightBandSeriesDelay = 0x02 => "8 Band Series Delay",
    FourBandTwoTapModDelay = 0x03 => "4 Band 2 Tap Mod. Delay",
    TwoBandFourTapModDelay = 0x04 => "2 Band 4 Tap Mod. Delay",
    EightMultiTapModDelay = 0x05 => "8 Multi Tap Mod. Delay",
    TwoBandLongFourShortModDelay = 0x06 => "2 Band Long + 4 Short Mod. Delay",
    ShortMediumLongModDelay = 0x07 => "Short + Medium + Long Mod. Delay",
    AmpSimulator = 0x08 => "Amp Simulator",
    Reverb = 0x09 => "Reverb",
    EarlyReflections = 0x0A => "Early Reflections",
    GateReverb = 0x0B => "Gate Reverb",
    ReverseGate = 0x0C => "Reverse Gate",
    MonoDelay = 0x0D => "Mono Delay",
    StereoDelay = 0x0E => "Stereo Delay",
    ModDelay = 0x0F => "Mod. Delay",
    DelayLcr = 0x10 => "Delay LCR",
    Echo = 0x11 => "Echo",
    Chorus = 0x12 => "Chorus",
    Flange = 0x13 => "Flange",
    Symphonic = 0x14 => "Symphonic",
    Phaser = 0x15 => "Phaser",
    AutoPan = 0x16 => "AutoPan",
    Tremolo = 0x17 => "Tremolo",
    HqPitch = 0x18 => "HQ Pitch",
    DualPitch = 0x19 => "Dual Pitch",
    Rotary = 0x1A => "Rotary",
    RingMod = 0x1B => "Ring Mod.",
    ModFilter = 0x1C => "Mod. Filter",
    DigitalDistortion = 0x1D => "Digital Distortion",
    DynamicFilter = 0x1E => "Dynamic Filter",
    DynamicFlange = 0x1F => "Dynamic Flange",
    DynamicPhaser = 0x20 => "Dynamic Phaser",
    ReverbChorusParallel = 0x21 => "Reverb + Chorus",
    ReverbChorusSerial = 0x22 => "Reverb -> Chorus",
    ReverbFlangeParallel = 0x23 => "Reverb + Flange",
    ReverbFlangeSerial = 0x24 => "Reverb -> Flange",
    ReverbSymphonicParallel = 0x25 => "Reverb + Symphonic",
    ReverbSymphonicSerial = 0x26 => "Reverb -> Symphonic",
    ReverbPan = 0x27 => "Reverb -> Pan",
    DelayEarlyRefParallel = 0x28 => "Delay + Early Ref.",
    DelayEarlyRefSerial = 0x29 => "Delay -> Early Ref.",
    DelayReverbParallel = 0x2A => "Delay + Reverb",
    DelayReverbSerial = 0x2B => "Delay -> Reverb",
    DistortionDelay = 0x2C => "Distortion -> Delay",
    MultiFilter = 0x2D => "Multi Filter",
    MultiBandDynamics = 0x2E => "M. Band Dynamic Processor",
    Distortion = 0x2F => "Distortion",
    VintageFlange = 0x30 => "Vintage Flange",
    MonoVintagePhaser = 0x31 => "Mono Vintage Phaser",
    StereoVintagePhaser = 0x32 => "Stereo Vintage Phaser",
    ThreeBandParametricEq = 0x33 => "3 Band Parametric EQ",
    SpringReverb = 0x34 => "Spring Reverb",
    TapeEcho = 0x35 => "Tape Echo",
    Compressor = 0x36 => "Compressor",
    AmpMultiChorus = 0x37 => "Amp Multi (Chorus)",
    AmpMultiFlange = 0x38 => "Amp Multi (Flange)",
    AmpMultiTremolo = 0x39 => "Amp Multi (Tremolo)",
    AmpMultiPhaser = 0x3A => "Amp Multi (Phaser)",
    AmpMultiRotary = 0x3B => "Amp Multi (Rotary)",
    AmpMultiPan = 0x3C => "Amp Multi (Pan)",
    AmpMultiPitch = 0x3D => "Amp Multi (Pitch)",
    AmpMultiFilter = 0x3E => "Amp Multi (Filter)",
    AmpMultiDistortion = 0x3F => "Amp Multi (Distortion)",
    BassPreamp = 0x40 => "Bass Preamp",
    BassMultiChorus = 0x41 => "Bass Multi (Chorus)",
    BassMultiFlange = 0x42 => "Bass Multi (Flange)",
    BassMultiTremolo = 0x43 => "Bass Multi (Tremolo)",
    BassMultiPhaser = 0x44 => "Bass Multi (Phaser)",
    BassMultiRotary = 0x45 => "Bass Multi (Rotary)",
    BassMultiPan = 0x46 => "Bass Multi (Pan)",
    BassMultiPitch = 0x47 => "Bass Multi (Pitch)",
    BassMultiFilter = 0x48 => "Bass Multi (Filter)",
    BassMultiDistortion = 0x49 => "Bass Multi (Distortion)",
}

impl EffectType {
    pub fn id(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for EffectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
