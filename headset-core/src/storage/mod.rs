pub mod sound_bundle;
