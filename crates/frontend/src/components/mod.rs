pub mod area_map;
pub mod area_overlay;
pub mod area_popup;
pub mod layer_menu;
