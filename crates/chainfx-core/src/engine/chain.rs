//! Mono channel processor - the five effect modules of one channel
//!
//! The modules live in fixed fields and are addressed through
//! [`EffectId`], which is a small stable index. A processing order is
//! therefore just a list of indices: for each sub-block the processor builds
//! a dispatch table of `(module, bypass)` pairs from the order and the live
//! bypass switches, then runs the modules strictly in table order.
//!
//! Building the table is a copy into a stack array; nothing here allocates
//! after `prepare`.

use crate::effect::native::{
    Chorus, GeneralFilter, GeneralFilterMode, GeneralFilterSettings, LadderFilter, LadderMode, Phaser,
};
use crate::effect::Effect;
use crate::order::{EffectId, ProcessingOrder, NUM_EFFECTS};
use crate::params::{ParamId, ParamStore, Smoothed, SmoothedParamBank};
use crate::types::Sample;

/// Bypass switch for each effect
pub fn bypass_param(id: EffectId) -> ParamId {
    match id {
        EffectId::Phase => ParamId::PhaserBypass,
        EffectId::Chorus => ParamId::ChorusBypass,
        EffectId::Overdrive => ParamId::OverdriveBypass,
        EffectId::LadderFilter => ParamId::LadderFilterBypass,
        EffectId::GeneralFilter => ParamId::GeneralFilterBypass,
    }
}

/// One chain position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchEntry {
    /// Module to run; `None` when the order slot held the sentinel
    pub effect: Option<EffectId>,
    pub bypassed: bool,
}

impl DispatchEntry {
    const EMPTY: Self = Self {
        effect: None,
        bypassed: false,
    };

    /// True if this entry will run its module
    #[inline]
    pub fn is_active(&self) -> bool {
        self.effect.is_some() && !self.bypassed
    }
}

/// Effect chain for a single channel
pub struct MonoChannelProcessor {
    phaser: Phaser,
    chorus: Chorus,
    overdrive: LadderFilter,
    ladder_filter: LadderFilter,
    general_filter: GeneralFilter,
    bypass: [bool; NUM_EFFECTS],
    process_general_filter: bool,
}

impl MonoChannelProcessor {
    pub fn new(process_general_filter: bool) -> Self {
        Self {
            phaser: Phaser::new(),
            chorus: Chorus::new(),
            overdrive: LadderFilter::overdrive(),
            ladder_filter: LadderFilter::new(),
            general_filter: GeneralFilter::new(),
            bypass: [false; NUM_EFFECTS],
            process_general_filter,
        }
    }

    /// Prepare every module for one channel at `sample_rate`
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        for id in EffectId::ALL {
            self.module_mut(id).prepare(sample_rate, max_block_size);
        }
    }

    /// Push smoothed values, modes and bypass switches into the modules
    pub fn update_from_params(&mut self, params: &ParamStore, smoothed: &SmoothedParamBank) {
        self.phaser.set_rate(smoothed.current(Smoothed::PhaserRate));
        self.phaser.set_centre_frequency(smoothed.current(Smoothed::PhaserCenterFreq));
        self.phaser.set_depth(smoothed.current(Smoothed::PhaserDepth));
        self.phaser.set_feedback(smoothed.current(Smoothed::PhaserFeedback));
        self.phaser.set_mix(smoothed.current(Smoothed::PhaserMix));

        self.chorus.set_rate(smoothed.current(Smoothed::ChorusRate));
        self.chorus.set_depth(smoothed.current(Smoothed::ChorusDepth));
        self.chorus.set_centre_delay(smoothed.current(Smoothed::ChorusCenterDelay));
        self.chorus.set_feedback(smoothed.current(Smoothed::ChorusFeedback));
        self.chorus.set_mix(smoothed.current(Smoothed::ChorusMix));

        self.overdrive.set_drive(smoothed.current(Smoothed::OverdriveSaturation));

        self.ladder_filter
            .set_mode(LadderMode::from_index(params.get_choice(ParamId::LadderFilterMode)));
        self.ladder_filter.set_cutoff(smoothed.current(Smoothed::LadderFilterCutoff));
        self.ladder_filter.set_resonance(smoothed.current(Smoothed::LadderFilterResonance));
        self.ladder_filter.set_drive(smoothed.current(Smoothed::LadderFilterDrive));

        self.general_filter.update(GeneralFilterSettings {
            mode: GeneralFilterMode::from_index(params.get_choice(ParamId::GeneralFilterMode)),
            freq: smoothed.current(Smoothed::GeneralFilterFreq),
            quality: smoothed.current(Smoothed::GeneralFilterQuality),
            gain_db: smoothed.current(Smoothed::GeneralFilterGain),
        });

        for id in EffectId::ALL {
            self.bypass[id.index()] = params.get_bool(bypass_param(id));
        }
    }

    /// Map each order position to its module and bypass state
    pub fn dispatch_table(&self, order: &ProcessingOrder) -> [DispatchEntry; NUM_EFFECTS] {
        let mut table = [DispatchEntry::EMPTY; NUM_EFFECTS];
        for (entry, slot) in table.iter_mut().zip(order.slots()) {
            if let Some(id) = *slot {
                *entry = DispatchEntry {
                    effect: Some(id),
                    bypassed: self.bypass[id.index()],
                };
            }
        }
        table
    }

    /// Run the chain over one sub-block in `order`
    pub fn process(&mut self, block: &mut [Sample], order: &ProcessingOrder) {
        for entry in self.dispatch_table(order) {
            let Some(id) = entry.effect else {
                continue;
            };
            if entry.bypassed {
                continue;
            }
            if id == EffectId::GeneralFilter && !self.process_general_filter {
                continue;
            }
            self.module_mut(id).process(block);
        }
    }

    pub fn module(&self, id: EffectId) -> &dyn Effect {
        match id {
            EffectId::Phase => &self.phaser,
            EffectId::Chorus => &self.chorus,
            EffectId::Overdrive => &self.overdrive,
            EffectId::LadderFilter => &self.ladder_filter,
            EffectId::GeneralFilter => &self.general_filter,
        }
    }

    fn module_mut(&mut self, id: EffectId) -> &mut dyn Effect {
        match id {
            EffectId::Phase => &mut self.phaser,
            EffectId::Chorus => &mut self.chorus,
            EffectId::Overdrive => &mut self.overdrive,
            EffectId::LadderFilter => &mut self.ladder_filter,
            EffectId::GeneralFilter => &mut self.general_filter,
        }
    }

    pub fn is_bypassed(&self, id: EffectId) -> bool {
        self.bypass[id.index()]
    }

    pub fn general_filter(&self) -> &GeneralFilter {
        &self.general_filter
    }

    pub fn processes_general_filter(&self) -> bool {
        self.process_general_filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::native::sine;
    use crate::params::SmoothingStyle;

    const SR: f32 = 48000.0;

    fn setup(params: &ParamStore, process_gf: bool) -> (MonoChannelProcessor, SmoothedParamBank) {
        let mut bank = SmoothedParamBank::new(SmoothingStyle::Exponential);
        bank.initialize(SR, 0.05, params);
        let mut chain = MonoChannelProcessor::new(process_gf);
        chain.prepare(SR, 64);
        chain.update_from_params(params, &bank);
        (chain, bank)
    }

    fn render(chain: &mut MonoChannelProcessor, order: &ProcessingOrder) -> Vec<f32> {
        let mut out = sine(220.0, SR, 2048);
        for block in out.chunks_mut(64) {
            chain.process(block, order);
        }
        out
    }

    fn differs(a: &[f32], b: &[f32]) -> bool {
        a.iter().zip(b).any(|(x, y)| (x - y).abs() > 1e-4)
    }

    /// Every stage audibly changes the signal
    fn colourful_params() -> ParamStore {
        let params = ParamStore::new();
        params.set(ParamId::PhaserMix, 0.5);
        params.set(ParamId::PhaserDepth, 0.8);
        params.set(ParamId::ChorusMix, 0.5);
        params.set(ParamId::OverdriveSaturation, 20.0);
        params.set(ParamId::LadderFilterCutoff, 800.0);
        params.set(ParamId::GeneralFilterGain, 12.0);
        params.set(ParamId::GeneralFilterFreq, 220.0);
        params
    }

    #[test]
    fn test_dispatch_follows_order() {
        let params = ParamStore::new();
        let (chain, _) = setup(&params, false);
        let order = ProcessingOrder::from_effects([
            EffectId::Overdrive,
            EffectId::Phase,
            EffectId::Chorus,
            EffectId::LadderFilter,
            EffectId::GeneralFilter,
        ]);
        let table = chain.dispatch_table(&order);
        let ids: Vec<_> = table.iter().map(|e| e.effect).collect();
        assert_eq!(ids, order.slots().to_vec());
        assert!(table.iter().all(DispatchEntry::is_active));
    }

    #[test]
    fn test_dispatch_marks_bypass_and_sentinels() {
        let params = ParamStore::new();
        params.set_bool(ParamId::ChorusBypass, true);
        let (chain, _) = setup(&params, false);
        let order = ProcessingOrder::from_codes([1, 5, 0, 5, 2]);
        let table = chain.dispatch_table(&order);
        assert_eq!(table[0], DispatchEntry { effect: Some(EffectId::Chorus), bypassed: true });
        assert_eq!(table[1], DispatchEntry::EMPTY);
        assert!(table[2].is_active());
        assert!(!table[3].is_active());
        assert_eq!(table[4].effect, Some(EffectId::Overdrive));
    }

    #[test]
    fn test_default_params_with_everything_bypassed_is_identity() {
        let params = colourful_params();
        for id in EffectId::ALL {
            params.set_bool(bypass_param(id), true);
        }
        let (mut chain, _) = setup(&params, true);
        let out = render(&mut chain, &ProcessingOrder::identity());
        assert_eq!(out, sine(220.0, SR, 2048));
    }

    #[test]
    fn test_bypassing_one_stage_removes_only_that_stage() {
        let params = colourful_params();
        let order = ProcessingOrder::identity();

        // Reference: chorus alone bypassed, everything else active
        params.set_bool(ParamId::ChorusBypass, true);
        let (mut bypassed, _) = setup(&params, true);
        let with_bypass = render(&mut bypassed, &order);
        assert!(bypassed.is_bypassed(EffectId::Chorus));

        // Same signal as a chain that simply has no chorus in it
        let without_chorus = ProcessingOrder::from_codes([0, 5, 2, 3, 4]);
        params.set_bool(ParamId::ChorusBypass, false);
        let (mut missing, _) = setup(&params, true);
        let skipped = render(&mut missing, &without_chorus);
        assert_eq!(with_bypass, skipped);

        // And different from the full chain
        let (mut full, _) = setup(&params, true);
        let all = render(&mut full, &order);
        assert!(differs(&all, &with_bypass));

        // The remaining stages still apply
        assert!(differs(&with_bypass, &sine(220.0, SR, 2048)));
    }

    #[test]
    fn test_order_matters() {
        let params = colourful_params();
        let (mut a, _) = setup(&params, true);
        let (mut b, _) = setup(&params, true);
        let forward = render(&mut a, &ProcessingOrder::identity());
        let reversed = render(&mut b, &ProcessingOrder::from_codes([4, 3, 2, 1, 0]));
        assert!(differs(&forward, &reversed));
    }

    #[test]
    fn test_general_filter_skipped_unless_enabled() {
        let params = ParamStore::new();
        params.set(ParamId::GeneralFilterGain, 12.0);
        params.set(ParamId::GeneralFilterFreq, 220.0);
        let only_gf = ProcessingOrder::from_codes([5, 5, 5, 5, 4]);
        let input = sine(220.0, SR, 2048);

        let (mut skipped, _) = setup(&params, false);
        assert_eq!(render(&mut skipped, &only_gf), input);
        // Coefficients are still maintained
        assert!(skipped.general_filter().coefficient_updates() >= 1);

        let (mut enabled, _) = setup(&params, true);
        assert!(enabled.processes_general_filter());
        assert!(differs(&render(&mut enabled, &only_gf), &input));
    }

    #[test]
    fn test_general_filter_updates_only_on_change() {
        let params = ParamStore::new();
        let (mut chain, bank) = setup(&params, true);
        let after_setup = chain.general_filter().coefficient_updates();
        assert_eq!(after_setup, 1);
        for _ in 0..10 {
            chain.update_from_params(&params, &bank);
        }
        assert_eq!(chain.general_filter().coefficient_updates(), 1);

        params.set(ParamId::GeneralFilterMode, 2.0);
        chain.update_from_params(&params, &bank);
        assert_eq!(chain.general_filter().coefficient_updates(), 2);
    }

    #[test]
    fn test_module_lookup() {
        let chain = MonoChannelProcessor::new(false);
        for id in EffectId::ALL {
            assert_eq!(chain.module(id).info().name, id.name());
        }
    }
}
