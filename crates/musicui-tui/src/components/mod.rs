pub mod now_playing;
pub mod track_list;
