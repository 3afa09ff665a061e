//! General MIDI instrument and drum names.

/// GM 1 program names; program number `n` (1-based) is at index `n - 1`.
pub const PROGRAMS: [&str; 128] = [
    // Piano
    "acoustic_grand_piano",
    "bright_acoustic_piano",
    "electric_grand_piano",
    "honky_tonk_piano",
    "electric_piano_1",
    "electric_piano_2",
    "harpsichord",
    "clavinet",
    // Chromatic percussion
    "celesta",
    "glockenspiel",
    "music_box",
    "vibraphone",
    "marimba",
    "xylophone",
    "tubular_bells",
    "dulcimer",
    // Organ
    "drawbar_organ",
    "percussive_organ",
    "rock_organ",
    "church_organ",
    "reed_organ",
    "accordion",
    "harmonica",
    "tango_accordion",
    // Guitar
    "acoustic_guitar_nylon",
    "acoustic_guitar_steel",
    "electric_guitar_jazz",
    "electric_guitar_clean",
    "electric_guitar_muted",
    "overdriven_guitar",
    "distortion_guitar",
    "guitar_harmonics",
    // Bass
    "acoustic_bass",
    "electric_bass_finger",
    "electric_bass_pick",
    "fretless_bass",
    "slap_bass_1",
    "slap_bass_2",
    "synth_bass_1",
    "synth_bass_2",
    // Strings
    "violin",
    "viola",
    "cello",
    "contrabass",
    "tremolo_strings",
    "pizzicato_strings",
    "orchestral_harp",
    "timpani",
    // Ensemble
    "string_ensemble_1",
    "string_ensemble_2",
    "synth_strings_1",
    "synth_strings_2",
    "choir_aahs",
    "voice_oohs",
    "synth_voice",
    "orchestra_hit",
    // Brass
    "trumpet",
    "trombone",
    "tuba",
    "muted_trumpet",
    "french_horn",
    "brass_section",
    "synth_brass_1",
    "synth_brass_2",
    // Reed
    "soprano_sax",
    "alto_sax",
    "tenor_sax",
    "baritone_sax",
    "oboe",
    "english_horn",
    "bassoon",
    "clarinet",
    // Pipe
    "piccolo",
    "flute",
    "recorder",
    "pan_flute",
    "blown_bottle",
    "shakuhachi",
    "whistle",
    "ocarina",
    // Synth lead
    "lead_square",
    "lead_sawtooth",
    "lead_calliope",
    "lead_chiff",
    "lead_charang",
    "lead_voice",
    "lead_fifths",
    "lead_bass",
    // Synth pad
    "pad_new_age",
    "pad_warm",
    "pad_polysynth",
    "pad_choir",
    "pad_bowed",
    "pad_metallic",
    "pad_halo",
    "pad_sweep",
    // Synth effects
    "fx_rain",
    "fx_soundtrack",
    "fx_crystal",
    "fx_atmosphere",
    "fx_brightness",
    "fx_goblins",
    "fx_echoes",
    "fx_sci_fi",
    // Ethnic
    "sitar",
    "banjo",
    "shamisen",
    "koto",
    "kalimba",
    "bagpipe",
    "fiddle",
    "shanai",
    // Percussive
    "tinkle_bell",
    "agogo",
    "steel_drums",
    "woodblock",
    "taiko_drum",
    "melodic_tom",
    "synth_drum",
    "reverse_cymbal",
    // Sound effects
    "guitar_fret_noise",
    "breath_noise",
    "seashore",
    "bird_tweet",
    "telephone_ring",
    "helicopter",
    "applause",
    "gunshot",
];

/// Lowest and highest GM percussion notes.
pub const FIRST_DRUM: u8 = 35;
pub const LAST_DRUM: u8 = 81;

/// GM percussion key map, starting at [`FIRST_DRUM`].
pub const DRUMS: [&str; 47] = [
    "acoustic_bass_drum",
    "bass_drum",
    "side_stick",
    "acoustic_snare",
    "hand_clap",
    "electric_snare",
    "low_floor_tom",
    "closed_hi_hat",
    "high_floor_tom",
    "pedal_hi_hat",
    "low_tom",
    "open_hi_hat",
    "low_mid_tom",
    "hi_mid_tom",
    "crash_cymbal_1",
    "high_tom",
    "ride_cymbal_1",
    "chinese_cymbal",
    "ride_bell",
    "tambourine",
    "splash_cymbal",
    "cowbell",
    "crash_cymbal_2",
    "vibraslap",
    "ride_cymbal_2",
    "hi_bongo",
    "low_bongo",
    "mute_hi_conga",
    "open_hi_conga",
    "low_conga",
    "high_timbale",
    "low_timbale",
    "high_agogo",
    "low_agogo",
    "cabasa",
    "maracas",
    "short_whistle",
    "long_whistle",
    "short_guiro",
    "long_guiro",
    "claves",
    "hi_wood_block",
    "low_wood_block",
    "mute_cuica",
    "open_cuica",
    "mute_triangle",
    "open_triangle",
];

/// 0-based program number of a named instrument.
pub fn program(name: &str) -> Option<u8> {
    PROGRAMS.iter().position(|&p| p == name).map(|i| i as u8)
}

/// Note number of a named drum.
pub fn drum(name: &str) -> Option<u8> {
    DRUMS
        .iter()
        .position(|&d| d == name)
        .map(|i| FIRST_DRUM + i as u8)
}
