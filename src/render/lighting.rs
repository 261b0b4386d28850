use super::{LightRig, Renderer};

/// Switches the renderer's output color space and compensates every light's
/// intensity so perceived brightness stays the same.
///
/// Entering gamma space multiplies intensities by `1 / factor`, leaving it
/// multiplies by `factor`. Returns false (and touches nothing) when the
/// renderer is already in the requested mode.
pub fn set_gamma_space(renderer: &mut Renderer, rig: &mut LightRig, enabled: bool) -> bool {
    if renderer.gamma_output == enabled {
        return false;
    }
    renderer.gamma_output = enabled;

    let factor = if enabled {
        1.0 / rig.intensity_factor()
    } else {
        rig.intensity_factor()
    };
    for light in rig.lights_mut() {
        light.intensity *= factor;
    }
    log::debug!(
        "gamma output {} (light intensities scaled by {:.4})",
        if enabled { "on" } else { "off" },
        factor
    );
    true
}

#[cfg(test)]
mod tests {
    use super::set_gamma_space;
    use crate::render::{LightRig, Renderer};

    fn intensities(rig: &LightRig) -> Vec<f32> {
        rig.lights().iter().map(|light| light.intensity).collect()
    }

    #[test]
    fn enabling_twice_rescales_once() {
        let mut renderer = Renderer::default();
        let mut rig = LightRig::studio(0.7, 0.3).unwrap();
        let original = intensities(&rig);

        assert!(set_gamma_space(&mut renderer, &mut rig, true));
        assert!(!set_gamma_space(&mut renderer, &mut rig, true));

        let factor = rig.intensity_factor();
        for (now, before) in intensities(&rig).iter().zip(&original) {
            assert!((now - before / factor).abs() < 1e-6);
        }
        assert!(renderer.gamma_output);
    }

    #[test]
    fn toggle_roundtrip_restores_intensities() {
        let mut renderer = Renderer::default();
        let mut rig = LightRig::studio(0.7, 0.3).unwrap();
        let original = intensities(&rig);

        set_gamma_space(&mut renderer, &mut rig, true);
        set_gamma_space(&mut renderer, &mut rig, false);

        for (now, before) in intensities(&rig).iter().zip(&original) {
            assert!((now - before).abs() < 1e-6);
        }
        assert!(!renderer.gamma_output);
    }

    #[test]
    fn disabling_when_already_linear_is_noop() {
        let mut renderer = Renderer::default();
        let mut rig = LightRig::studio(0.7, 0.3).unwrap();
        let original = intensities(&rig);
        assert!(!set_gamma_space(&mut renderer, &mut rig, false));
        assert_eq!(intensities(&rig), original);
    }
}
